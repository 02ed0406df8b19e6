use serde::{Deserialize, Serialize};

/// A file mention harvested (or LLM-proposed) from a summary's source turns
/// (spec §4.6, §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMention {
    pub path: String,
    pub is_absolute: bool,
}

impl FileMention {
    /// `is_absolute` is by path syntax only: a Unix leading `/` or a Windows
    /// drive letter (spec §4.7). Recomputed here so it is independent of
    /// whatever an LLM happened to claim.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let is_absolute = is_absolute_path(&path);
        Self { path, is_absolute }
    }
}

pub fn is_absolute_path(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Kind of graph node a `[kind:uuid]` mention pattern can reference
/// (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMentionKind {
    Scope,
    File,
    Webpage,
    Document,
    MarkdownSection,
    Codeblock,
}

impl NodeMentionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeMentionKind::Scope => "scope",
            NodeMentionKind::File => "file",
            NodeMentionKind::Webpage => "webpage",
            NodeMentionKind::Document => "document",
            NodeMentionKind::MarkdownSection => "markdown_section",
            NodeMentionKind::Codeblock => "codeblock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "scope" => NodeMentionKind::Scope,
            "file" => NodeMentionKind::File,
            "webpage" => NodeMentionKind::Webpage,
            "document" => NodeMentionKind::Document,
            "markdown_section" => NodeMentionKind::MarkdownSection,
            "codeblock" => NodeMentionKind::Codeblock,
            _ => return None,
        })
    }
}

/// A graph-node mention, either harvested deterministically from tool
/// arguments/results or proposed by the LLM summary generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMention {
    pub uuid: String,
    pub name: String,
    pub kind: NodeMentionKind,
    pub reason: String,
}
