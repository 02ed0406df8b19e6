//! Mention Extractor (spec §4.7): walks tool call arguments/results for
//! file paths and `[kind:UUID]` node references.

use hcme_types::{FileMention, NodeMention, NodeMentionKind, ToolCall, ToolResult};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static UNIX_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s\x22\x27(])(/[\w.\-]+(?:/[\w.\-]+)+)").unwrap());
static RELATIVE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s\x22\x27(])((?:\./)?[\w.\-]+(?:/[\w.\-]+)+\.\w{1,8})").unwrap()
});
static WINDOWS_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s\x22\x27(])([A-Za-z]:\\[\w.\- \\]+)").unwrap());
static NODE_MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[(scope|file|webpage|document|markdown_section|codeblock):([0-9a-fA-F-]{32,36})\]",
    )
    .unwrap()
});

/// Extracted mentions, deduplicated by canonical path and by uuid.
#[derive(Debug, Clone, Default)]
pub struct ExtractedMentions {
    pub files: Vec<FileMention>,
    pub nodes: Vec<NodeMention>,
}

/// Harvest mentions from every tool call's arguments and its result, if any.
pub fn extract_mentions<'a>(
    calls: impl IntoIterator<Item = (&'a ToolCall, Option<&'a ToolResult>)>,
) -> ExtractedMentions {
    let mut files: BTreeMap<String, FileMention> = BTreeMap::new();
    let mut nodes: BTreeMap<String, NodeMention> = BTreeMap::new();

    for (call, result) in calls {
        scan_text(&call.arguments, &mut files, &mut nodes);
        if let Some(result) = result {
            scan_text(&result.result, &mut files, &mut nodes);
            if let Some(error) = &result.error {
                scan_text(error, &mut files, &mut nodes);
            }
        }
    }

    ExtractedMentions {
        files: files.into_values().collect(),
        nodes: nodes.into_values().collect(),
    }
}

/// Walk `raw` as JSON if it parses, otherwise as plain text, collecting every
/// string leaf into the path/node scanners.
fn scan_text(raw: &str, files: &mut BTreeMap<String, FileMention>, nodes: &mut BTreeMap<String, NodeMention>) {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => walk_json(&value, files, nodes),
        Err(_) => scan_string(raw, files, nodes),
    }
}

fn walk_json(value: &Value, files: &mut BTreeMap<String, FileMention>, nodes: &mut BTreeMap<String, NodeMention>) {
    match value {
        Value::String(s) => scan_string(s, files, nodes),
        Value::Array(items) => {
            for item in items {
                walk_json(item, files, nodes);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                walk_json(item, files, nodes);
            }
        }
        _ => {}
    }
}

fn scan_string(s: &str, files: &mut BTreeMap<String, FileMention>, nodes: &mut BTreeMap<String, NodeMention>) {
    for re in [&*UNIX_PATH_RE, &*RELATIVE_PATH_RE, &*WINDOWS_PATH_RE] {
        for caps in re.captures_iter(s) {
            if let Some(m) = caps.get(1) {
                let path = m.as_str().to_string();
                let canonical = canonicalize_path(&path);
                files.entry(canonical).or_insert_with(|| FileMention::from_path(path));
            }
        }
    }

    for caps in NODE_MENTION_RE.captures_iter(s) {
        let kind = NodeMentionKind::parse(&caps[1]);
        let uuid = caps[2].to_string();
        if let Some(kind) = kind {
            nodes.entry(uuid.clone()).or_insert_with(|| NodeMention {
                uuid,
                name: String::new(),
                kind,
                reason: "mentioned in tool call".to_string(),
            });
        }
    }
}

/// Canonical dedup key: strip a leading slash so `/a/b` and `a/b` collapse
/// onto the same file when they plausibly denote the same project-relative
/// location (spec §4.7's "path without leading slash" match attempt).
fn canonicalize_path(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn call(args: &str) -> ToolCall {
        ToolCall::new("t1", "m1", "Read", args, Utc::now())
    }

    #[test]
    fn extracts_absolute_unix_path_from_arguments() {
        let c = call(r#"{"path": "/root/crate/src/lib.rs"}"#);
        let extracted = extract_mentions([(&c, None)]);
        assert_eq!(extracted.files.len(), 1);
        assert!(extracted.files[0].is_absolute);
        assert_eq!(extracted.files[0].path, "/root/crate/src/lib.rs");
    }

    #[test]
    fn extracts_relative_path_from_plain_text_result() {
        let c = call(r#"{"pattern": "foo"}"#);
        let result = ToolResult::new("r1", "t1", true, "match in src/main.rs:12", None, Utc::now());
        let extracted = extract_mentions([(&c, Some(&result))]);
        assert!(extracted.files.iter().any(|f| f.path == "src/main.rs" && !f.is_absolute));
    }

    #[test]
    fn extracts_node_mention_pattern() {
        let c = call(r#"{"note": "see [file:3fa85f64-5717-4562-b3fc-2c963f66afa6] for context"}"#);
        let extracted = extract_mentions([(&c, None)]);
        assert_eq!(extracted.nodes.len(), 1);
        assert_eq!(extracted.nodes[0].kind, NodeMentionKind::File);
        assert_eq!(extracted.nodes[0].uuid, "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[test]
    fn dedups_same_path_seen_twice() {
        let c = call(r#"{"a": "/x/y/z.rs", "b": "/x/y/z.rs"}"#);
        let extracted = extract_mentions([(&c, None)]);
        assert_eq!(extracted.files.len(), 1);
    }
}
