//! Prompt section composition (spec §4.12): a configurable, ordered
//! sequence of named sections. Sections with no content are omitted.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    SystemPrompt,
    ToolDescriptions,
    CurrentReport,
    UserTask,
    ContextData,
    InputFields,
    ToolResults,
    PreviousOutput,
    OutputFormat,
    Instructions,
}

impl SectionKind {
    fn tag(self) -> &'static str {
        match self {
            SectionKind::SystemPrompt => "system_prompt",
            SectionKind::ToolDescriptions => "tool_descriptions",
            SectionKind::CurrentReport => "current_report",
            SectionKind::UserTask => "user_task",
            SectionKind::ContextData => "context_data",
            SectionKind::InputFields => "input_fields",
            SectionKind::ToolResults => "tool_results",
            SectionKind::PreviousOutput => "previous_output",
            SectionKind::OutputFormat => "output_format",
            SectionKind::Instructions => "instructions",
        }
    }
}

/// The default section order, matching the spec's enumeration. Callers may
/// supply a different `order` to reorder or drop sections.
pub const DEFAULT_ORDER: &[SectionKind] = &[
    SectionKind::SystemPrompt,
    SectionKind::ToolDescriptions,
    SectionKind::CurrentReport,
    SectionKind::UserTask,
    SectionKind::ContextData,
    SectionKind::InputFields,
    SectionKind::ToolResults,
    SectionKind::PreviousOutput,
    SectionKind::OutputFormat,
    SectionKind::Instructions,
];

#[derive(Debug, Clone, Default)]
pub struct PromptSections {
    pub order: Vec<SectionKind>,
    content: Vec<(SectionKind, String)>,
}

impl PromptSections {
    pub fn new(order: Vec<SectionKind>) -> Self {
        Self {
            order,
            content: Vec::new(),
        }
    }

    pub fn set(&mut self, kind: SectionKind, body: impl Into<String>) -> &mut Self {
        let body = body.into();
        if let Some(entry) = self.content.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = body;
        } else {
            self.content.push((kind, body));
        }
        self
    }

    fn get(&self, kind: SectionKind) -> Option<&str> {
        self.content
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, body)| body.as_str())
            .filter(|body| !body.is_empty())
    }

    pub fn compose(&self) -> String {
        self.order
            .iter()
            .filter_map(|kind| self.get(*kind).map(|body| format!("<{tag}>\n{body}\n</{tag}>", tag = kind.tag())))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
