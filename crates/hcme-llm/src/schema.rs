//! Output-format schema and template rendering (spec §4.12): the
//! `output_format` prompt section emits a schema-aware template so the
//! model knows exactly which fields to fill in.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xml,
    Json,
    Yaml,
}

#[derive(Debug, Clone)]
pub enum FieldSchema {
    Text,
    List(Box<FieldSchema>),
    Object(Vec<(String, FieldSchema)>),
}

#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub root_tag: String,
    pub fields: Vec<(String, FieldSchema)>,
}

pub fn render_template(schema: &OutputSchema, format: OutputFormat) -> String {
    match format {
        OutputFormat::Xml => render_xml(&schema.root_tag, &schema.fields, 0),
        OutputFormat::Json => format!(
            "{{\n{}\n}}",
            render_json_fields(&schema.fields, 1).join(",\n")
        ),
        OutputFormat::Yaml => render_yaml_fields(&schema.fields, 0).join("\n"),
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

fn render_xml(tag: &str, fields: &[(String, FieldSchema)], level: usize) -> String {
    let pad = indent(level);
    let body = fields
        .iter()
        .map(|(name, field)| render_xml_field(name, field, level + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{pad}<{tag}>\n{body}\n{pad}</{tag}>")
}

fn render_xml_field(name: &str, field: &FieldSchema, level: usize) -> String {
    let pad = indent(level);
    match field {
        FieldSchema::Text => format!("{pad}<{name}>...</{name}>"),
        FieldSchema::List(item) => {
            let item_body = render_xml_field("item", item, level + 1);
            format!("{pad}<{name}>\n{item_body}\n{pad}  (repeat per item)\n{pad}</{name}>")
        }
        FieldSchema::Object(nested) => render_xml(name, nested, level),
    }
}

fn render_json_fields(fields: &[(String, FieldSchema)], level: usize) -> Vec<String> {
    let pad = indent(level);
    fields
        .iter()
        .map(|(name, field)| format!("{pad}\"{name}\": {}", render_json_field(field, level)))
        .collect()
}

fn render_json_field(field: &FieldSchema, level: usize) -> String {
    match field {
        FieldSchema::Text => "\"...\"".to_string(),
        FieldSchema::List(item) => format!("[{}]", render_json_field(item, level)),
        FieldSchema::Object(nested) => format!(
            "{{\n{}\n{}}}",
            render_json_fields(nested, level + 1).join(",\n"),
            indent(level)
        ),
    }
}

fn render_yaml_fields(fields: &[(String, FieldSchema)], level: usize) -> Vec<String> {
    let pad = indent(level);
    fields
        .iter()
        .flat_map(|(name, field)| render_yaml_field(&pad, name, field, level))
        .collect()
}

fn render_yaml_field(pad: &str, name: &str, field: &FieldSchema, level: usize) -> Vec<String> {
    match field {
        FieldSchema::Text => vec![format!("{pad}{name}: ...")],
        FieldSchema::List(item) => {
            let mut lines = vec![format!("{pad}{name}:")];
            lines.push(format!("{pad}  - {}", render_yaml_field("", "item", item, level + 1).join(", ")));
            lines
        }
        FieldSchema::Object(nested) => {
            let mut lines = vec![format!("{pad}{name}:")];
            lines.extend(render_yaml_fields(nested, level + 1));
            lines
        }
    }
}
