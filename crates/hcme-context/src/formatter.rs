//! Context Formatter (spec §4.11): deterministic, confidence-ordered
//! rendering of the sections the Context Builder assembled.

use crate::builder::{ContextSections, RenderedHit};
use hcme_types::Turn;

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub working_dir: String,
    pub project_name: Option<String>,
}

/// `format_context` (spec §4.11): five sections, in order, each omitted
/// entirely when its source contributed nothing.
pub fn format_context(sections: &ContextSections, options: &FormatOptions) -> String {
    let blocks = [
        format_last_user_queries(&sections.last_user_queries),
        format_recent_turns(&sections.recent_turns),
        format_relevant_past_context(&sections.semantic_hits),
        format_code_context(sections, options),
        format_recent_l1_summaries(sections),
    ];

    blocks.into_iter().flatten().collect::<Vec<_>>().join("\n\n")
}

fn format_last_user_queries(queries: &[String]) -> Option<String> {
    if queries.is_empty() {
        return None;
    }
    let mut body = String::from("## Last User Queries\n");
    for (i, query) in queries.iter().enumerate() {
        body.push_str(&format!("{}. {}\n", i + 1, query));
    }
    Some(body)
}

fn format_recent_turns(turns: &[Turn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }
    let mut body = String::from("## Recent Conversation (Raw)\n");
    for turn in turns {
        body.push_str(&format!("User: {}\n", turn.user.content));
        for member in &turn.assistant_members {
            body.push_str(&format!("Assistant: {}\n", member.content));
        }
        if !turn.tool_calls.is_empty() {
            let tools = turn
                .tool_calls
                .iter()
                .map(|tc| tc.call.tool_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            body.push_str(&format!("Tools used: {tools}\n"));
        }
        body.push('\n');
    }
    Some(body)
}

fn format_relevant_past_context(hits: &[RenderedHit]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }
    let mut body = String::from("## Relevant Past Context\n");
    for (confidence, label) in [(1.0f32, "Confidence 1.0 (Raw Turns)"), (0.7, "Confidence 0.7 (L1)"), (0.5, "Confidence 0.5 (L2)")] {
        let mut tier: Vec<&RenderedHit> = hits.iter().filter(|h| (h.confidence - confidence).abs() < 1e-6).collect();
        if tier.is_empty() {
            continue;
        }
        tier.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        body.push_str(&format!("### {label}\n"));
        for hit in tier {
            body.push_str(&format!("- ({:.2}) {}\n", hit.score, hit.text));
        }
    }
    Some(body)
}

fn format_code_context(sections: &ContextSections, options: &FormatOptions) -> Option<String> {
    if sections.code_hits.is_empty() {
        return None;
    }
    let mut body = String::from("## Relevant Code Context\n");
    for hit in &sections.code_hits {
        let path = relative_path(&hit.file, options);
        let lines = hit.end_line.saturating_sub(hit.start_line) + 1;
        let relevance = (hit.score * 100.0).round();
        let name = signature_line(&hit.source);
        body.push_str(&format!(
            "[{path}:{}-{}] {name} (Relevance {relevance}%, File: {lines} lines)\n{}\n\n",
            hit.start_line, hit.end_line, hit.source
        ));
    }
    Some(body)
}

fn format_recent_l1_summaries(sections: &ContextSections) -> Option<String> {
    if sections.recent_l1_summaries.is_empty() {
        return None;
    }
    let mut body = String::from("## Recent Level 1 Summaries\n");
    for summary in &sections.recent_l1_summaries {
        body.push_str(&format!(
            "- [{}..{}] {} {}\n",
            summary.start_turn_index, summary.end_turn_index, summary.content.conversation_summary, summary.content.actions_summary
        ));
    }
    Some(body)
}

/// Relative to `working_dir` when the file is under it; otherwise prefixed
/// with `[Project: <name>]` when a project name is known (spec §4.11).
fn relative_path(file: &str, options: &FormatOptions) -> String {
    if !options.working_dir.is_empty() {
        if let Some(stripped) = file.strip_prefix(&options.working_dir) {
            return stripped.trim_start_matches('/').to_string();
        }
    }
    match &options.project_name {
        Some(name) => format!("[Project: {name}] {file}"),
        None => file.to_string(),
    }
}

fn signature_line(source: &str) -> &str {
    source.lines().find(|line| !line.trim().is_empty()).unwrap_or(source).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcme_retrieval::CodeHit;

    #[test]
    fn omits_sections_with_no_content() {
        let sections = ContextSections::default();
        let rendered = format_context(&sections, &FormatOptions::default());
        assert!(rendered.is_empty());
    }

    #[test]
    fn relevant_past_context_groups_by_confidence_tier() {
        let sections = ContextSections {
            semantic_hits: vec![
                RenderedHit { level: 1, score: 0.5, confidence: 0.7, text: "l1 hit".to_string() },
                RenderedHit { level: 0, score: 0.9, confidence: 1.0, text: "raw hit".to_string() },
            ],
            ..Default::default()
        };
        let rendered = format_context(&sections, &FormatOptions::default());
        let raw_idx = rendered.find("Confidence 1.0").unwrap();
        let l1_idx = rendered.find("Confidence 0.7").unwrap();
        assert!(raw_idx < l1_idx);
    }

    #[test]
    fn code_context_strips_working_dir_prefix() {
        let sections = ContextSections {
            code_hits: vec![CodeHit {
                file: "/repo/src/lib.rs".to_string(),
                start_line: 1,
                end_line: 3,
                source: "fn example() {}".to_string(),
                score: 0.8,
                confidence: 1.0,
            }],
            ..Default::default()
        };
        let options = FormatOptions {
            working_dir: "/repo".to_string(),
            project_name: None,
        };
        let rendered = format_context(&sections, &options);
        assert!(rendered.contains("[src/lib.rs:1-3]"));
        assert!(rendered.contains("fn example() {}"));
    }

    #[test]
    fn code_context_prefixes_project_name_when_outside_working_dir() {
        let sections = ContextSections {
            code_hits: vec![CodeHit {
                file: "/other/src/lib.rs".to_string(),
                start_line: 1,
                end_line: 1,
                source: "fn f() {}".to_string(),
                score: 0.5,
                confidence: 1.0,
            }],
            ..Default::default()
        };
        let options = FormatOptions {
            working_dir: "/repo".to_string(),
            project_name: Some("other-proj".to_string()),
        };
        let rendered = format_context(&sections, &options);
        assert!(rendered.contains("[Project: other-proj] /other/src/lib.rs"));
    }
}
