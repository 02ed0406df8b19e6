//! Tool-context compaction (spec §4.12): once accumulated tool-result
//! characters cross a threshold, compress the history in place into a
//! structured summary via a dedicated LLM call.

use crate::error::Result;
use crate::parse::{parse_output, ParseFormat};
use hcme_providers::LlmProvider;
use serde_json::Value;

const SUMMARY_SECTIONS: &[&str] = &["resources", "nodes", "findings", "suggestions", "gaps"];

pub async fn compact_tool_context(llm: &dyn LlmProvider, tool_context: &str, request_id: &str) -> Result<String> {
    let prompt = format!(
        "Summarize the following tool results into <resources>, <nodes>, <findings>, \
         <suggestions>, and <gaps> sections. Keep each section terse.\n\n{tool_context}"
    );
    let response = llm.generate(&prompt, request_id).await?;
    let parsed = parse_output(ParseFormat::Xml, &response, &[]).unwrap_or(Value::Null);
    Ok(render_compacted_summary(&parsed))
}

fn render_compacted_summary(parsed: &Value) -> String {
    SUMMARY_SECTIONS
        .iter()
        .filter_map(|section| parsed.get(section).map(|value| format!("{section}: {}", flatten(value))))
        .collect::<Vec<_>>()
        .join("\n")
}

fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join("; "),
        Value::Object(map) => map.values().map(flatten).collect::<Vec<_>>().join("; "),
        other => other.to_string(),
    }
}
