//! Response parsing (spec §4.12): permissive, best-effort. JSON and YAML
//! accept fenced code blocks; XML is parsed element/attribute-based;
//! unrecognized fields are ignored; missing required fields raise a parse
//! error carrying a preview of the raw response.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFormat {
    Xml,
    Json,
    Yaml,
}

/// Parses `raw` under `format`, then checks every name in `required_fields`
/// is present as a top-level key.
pub fn parse_output(format: ParseFormat, raw: &str, required_fields: &[&str]) -> Result<Value> {
    let stripped = strip_fence(raw);
    let value = match format {
        ParseFormat::Json => serde_json::from_str(stripped)
            .map_err(|e| Error::Parse(format!("invalid JSON ({e}): {}", preview(raw))))?,
        ParseFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(stripped)
                .map_err(|e| Error::Parse(format!("invalid YAML ({e}): {}", preview(raw))))?;
            yaml_to_json(yaml)
        }
        ParseFormat::Xml => parse_xml_permissive(stripped)
            .map_err(|e| Error::Parse(format!("invalid XML ({e}): {}", preview(raw))))?,
    };

    for field in required_fields {
        if value.get(*field).is_none() {
            return Err(Error::Parse(format!(
                "missing required field {field:?}: {}",
                preview(raw)
            )));
        }
    }

    Ok(value)
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}

/// Strips a single fenced code block (```lang\n...\n```), if present;
/// otherwise returns the input unchanged.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.rfind("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut object = Map::new();
            for (k, v) in map {
                if let serde_yaml::Value::String(key) = k {
                    object.insert(key, yaml_to_json(v));
                }
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Best-effort XML-to-JSON conversion: an element with only text content
/// becomes a string; an element with child elements becomes an object;
/// a repeated child tag becomes an array. Attributes are ignored beyond
/// being consumed by the reader — the spec's element-based extraction
/// covers every field HCME's schemas use.
fn parse_xml_permissive(raw: &str) -> std::result::Result<Value, quick_xml::Error> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text = true;

    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
                stack.push((name, Map::new(), String::new()));
            }
            Event::Empty(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
                insert_child(&mut stack, &mut root, name, Value::String(String::new()));
            }
            Event::Text(text) => {
                if let Some((_, _, buf)) = stack.last_mut() {
                    buf.push_str(&text.unescape().unwrap_or_default());
                }
            }
            Event::End(_) => {
                let Some((name, children, text)) = stack.pop() else {
                    continue;
                };
                let value = if children.is_empty() {
                    Value::String(text)
                } else {
                    Value::Object(children)
                };
                insert_child(&mut stack, &mut root, name, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(root.unwrap_or_else(|| Value::Object(Map::new())))
}

fn insert_child(
    stack: &mut [(String, Map<String, Value>, String)],
    root: &mut Option<Value>,
    name: String,
    value: Value,
) {
    match stack.last_mut() {
        Some((_, children, _)) => merge_into(children, name, value),
        None => {
            if let Value::Object(map) = &value {
                *root = Some(Value::Object(map.clone()));
            } else {
                let mut map = Map::new();
                map.insert(name, value);
                *root = Some(Value::Object(map));
            }
        }
    }
}

fn merge_into(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let previous = existing.clone();
            children.insert(name, Value::Array(vec![previous, value]));
        }
        None => {
            children.insert(name, value);
        }
    }
}
