//! Concrete implementations of the two trait seams the engine and
//! retriever crates define for the Structured LLM Executor: summary
//! generation (spec §4.6) and the Code Searcher's LLM-guided fallback
//! (spec §4.9).

use crate::config::ExecutorConfig;
use crate::error::Error;
use crate::parse::ParseFormat;
use crate::prompt::{PromptSections, SectionKind};
use crate::schema::{FieldSchema, OutputFormat, OutputSchema};
use crate::single::{run_single, SingleOptions, ToolCallRequest, ToolExecutor};
use async_trait::async_trait;
use hcme_engine::summarization::SummaryExecutor;
use hcme_providers::{FileToolbox, LlmProvider};
use hcme_retrieval::{CodeHit, CodeSearchFallback, DirectoryComposition};
use hcme_types::{FileMention, NodeMention, NodeMentionKind, Summary, SummaryGenerationOutput, Turn};
use serde_json::Value;

fn summary_schema() -> OutputSchema {
    OutputSchema {
        root_tag: "summary".to_string(),
        fields: vec![
            ("conversation_summary".to_string(), FieldSchema::Text),
            ("actions_summary".to_string(), FieldSchema::Text),
            (
                "files_mentioned".to_string(),
                FieldSchema::List(Box::new(FieldSchema::Object(vec![(
                    "path".to_string(),
                    FieldSchema::Text,
                )]))),
            ),
            (
                "nodes_mentioned".to_string(),
                FieldSchema::List(Box::new(FieldSchema::Object(vec![
                    ("uuid".to_string(), FieldSchema::Text),
                    ("name".to_string(), FieldSchema::Text),
                    ("kind".to_string(), FieldSchema::Text),
                    ("reason".to_string(), FieldSchema::Text),
                ]))),
            ),
        ],
    }
}

fn summary_sections(task: String, source: String) -> PromptSections {
    let mut sections = PromptSections::new(vec![
        SectionKind::SystemPrompt,
        SectionKind::UserTask,
        SectionKind::ContextData,
        SectionKind::OutputFormat,
    ]);
    sections.set(
        SectionKind::SystemPrompt,
        "You maintain a hierarchical memory of an ongoing conversation. \
         Summarize the given material faithfully and concisely.",
    );
    sections.set(SectionKind::UserTask, task);
    sections.set(SectionKind::ContextData, source);
    sections.set(
        SectionKind::OutputFormat,
        crate::schema::render_template(&summary_schema(), OutputFormat::Xml),
    );
    sections
}

fn render_turn(turn: &Turn) -> String {
    let mut rendered = format!("User: {}\n", turn.user.content);
    for member in &turn.assistant_members {
        rendered.push_str(&format!("Assistant: {}\n", member.content));
    }
    for tc in &turn.tool_calls {
        rendered.push_str(&format!("Tool[{}]: {}\n", tc.call.tool_name, tc.call.arguments));
        if let Some(result) = &tc.result {
            rendered.push_str(&format!("Result: {}\n", result.result));
        }
    }
    rendered
}

fn render_summary(summary: &Summary) -> String {
    format!(
        "[{:?} {}..{}] {} {}",
        summary.level,
        summary.start_turn_index,
        summary.end_turn_index,
        summary.content.conversation_summary,
        summary.content.actions_summary
    )
}

/// Drives the Summary Generator's LLM call through the Single executor with
/// tools disabled (spec §4.6 is a one-shot structured-output call, not a
/// tool-calling loop).
pub struct LlmSummaryExecutor<'a> {
    pub llm: &'a dyn LlmProvider,
    pub config: ExecutorConfig,
}

impl<'a> LlmSummaryExecutor<'a> {
    pub fn new(llm: &'a dyn LlmProvider, config: ExecutorConfig) -> Self {
        Self { llm, config }
    }

    async fn run(&self, request_id: &str, sections: PromptSections) -> hcme_engine::Result<SummaryGenerationOutput> {
        let options = SingleOptions {
            sections,
            format: ParseFormat::Xml,
            required_fields: vec!["conversation_summary".to_string(), "actions_summary".to_string()],
            tools_enabled: false,
            progressive: false,
            completion_field: None,
            completion_values: Vec::new(),
        };
        let parsed = run_single(self.llm, None, request_id, options, &self.config)
            .await
            .map_err(Error::into_engine)?;
        Ok(parse_summary_output(&parsed))
    }
}

/// Field-by-field extraction rather than `serde_json::from_value`: the
/// model's text fields (e.g. `is_absolute`, `kind`) don't carry the same
/// typed shape `FileMention`/`NodeMention` expect, and both are recomputed
/// or defaulted downstream regardless of what the model supplies.
fn parse_summary_output(parsed: &Value) -> SummaryGenerationOutput {
    let text = |field: &str| parsed.get(field).and_then(Value::as_str).unwrap_or_default().to_string();

    let files_mentioned = parsed
        .get("files_mentioned")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("path").and_then(Value::as_str))
        .map(FileMention::from_path)
        .collect();

    let nodes_mentioned = parsed
        .get("nodes_mentioned")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let uuid = entry.get("uuid").and_then(Value::as_str)?.to_string();
            let name = entry.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let kind = entry
                .get("kind")
                .and_then(Value::as_str)
                .and_then(NodeMentionKind::parse)
                .unwrap_or(NodeMentionKind::Scope);
            let reason = entry.get("reason").and_then(Value::as_str).unwrap_or_default().to_string();
            Some(NodeMention { uuid, name, kind, reason })
        })
        .collect();

    SummaryGenerationOutput {
        conversation_summary: text("conversation_summary"),
        actions_summary: text("actions_summary"),
        files_mentioned,
        nodes_mentioned,
    }
}

#[async_trait]
impl<'a> SummaryExecutor for LlmSummaryExecutor<'a> {
    async fn summarize_turns(
        &self,
        conversation_id: &str,
        turns: &[Turn],
    ) -> hcme_engine::Result<SummaryGenerationOutput> {
        let source = turns.iter().map(render_turn).collect::<Vec<_>>().join("\n");
        let task = format!(
            "Summarize the following {} turn(s) of conversation {conversation_id} into a rolling memory entry.",
            turns.len()
        );
        self.run(
            &format!("summarize-turns-{conversation_id}"),
            summary_sections(task, source),
        )
        .await
    }

    async fn summarize_summaries(
        &self,
        conversation_id: &str,
        summaries: &[Summary],
    ) -> hcme_engine::Result<SummaryGenerationOutput> {
        let source = summaries.iter().map(render_summary).collect::<Vec<_>>().join("\n");
        let task = format!(
            "Roll up the following {} L1 summary/summaries of conversation {conversation_id} into one L2 summary.",
            summaries.len()
        );
        self.run(
            &format!("summarize-summaries-{conversation_id}"),
            summary_sections(task, source),
        )
        .await
    }
}

impl Error {
    fn into_engine(self) -> hcme_engine::Error {
        self.into()
    }
}

fn code_fallback_schema() -> OutputSchema {
    OutputSchema {
        root_tag: "findings".to_string(),
        fields: vec![(
            "hits".to_string(),
            FieldSchema::List(Box::new(FieldSchema::Object(vec![
                ("file".to_string(), FieldSchema::Text),
                ("start_line".to_string(), FieldSchema::Text),
                ("end_line".to_string(), FieldSchema::Text),
                ("source".to_string(), FieldSchema::Text),
            ]))),
        )],
    }
}

/// Drives the Code Searcher's one round of parallel tool calls over
/// `{grep_files, list_directory, glob_files}` (spec §4.9; `brain_search` is
/// the semantic path itself and is not re-offered here since the fallback
/// only runs when that path was unavailable).
pub struct LlmCodeSearchFallback<'a> {
    pub llm: &'a dyn LlmProvider,
    pub file_toolbox: &'a dyn FileToolbox,
    pub working_dir: String,
    pub config: ExecutorConfig,
}

struct FileToolboxExecutor<'a> {
    file_toolbox: &'a dyn FileToolbox,
}

#[async_trait]
impl<'a> ToolExecutor for FileToolboxExecutor<'a> {
    async fn execute(&self, call: &ToolCallRequest) -> crate::error::Result<String> {
        let args = &call.arguments;
        let arg_str = |key: &str| args.get(key).and_then(Value::as_str).unwrap_or_default();
        let output = match call.name.as_str() {
            "grep_files" => {
                let matches = self.file_toolbox.grep_files(arg_str("pattern"), arg_str("path")).await?;
                matches
                    .into_iter()
                    .map(|m| format!("{}:{}: {}", m.file, m.line, m.text))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            "list_directory" => self.file_toolbox.list_directory(arg_str("path")).await?.join("\n"),
            "glob_files" => self
                .file_toolbox
                .glob_files(arg_str("pattern"), arg_str("path"))
                .await?
                .join("\n"),
            other => format!("unknown tool: {other}"),
        };
        Ok(output)
    }
}

#[async_trait]
impl<'a> CodeSearchFallback for LlmCodeSearchFallback<'a> {
    async fn search(
        &self,
        query: &str,
        composition: &DirectoryComposition,
    ) -> hcme_retrieval::Result<Vec<CodeHit>> {
        let mut sections = PromptSections::new(vec![
            SectionKind::SystemPrompt,
            SectionKind::ToolDescriptions,
            SectionKind::UserTask,
            SectionKind::ContextData,
            SectionKind::ToolResults,
            SectionKind::OutputFormat,
        ]);
        sections.set(
            SectionKind::SystemPrompt,
            "Locate the code most relevant to the task using the available tools, \
             then report the exact file spans you found.",
        );
        sections.set(
            SectionKind::ToolDescriptions,
            "grep_files(pattern, path), list_directory(path), glob_files(pattern, path)",
        );
        sections.set(SectionKind::UserTask, query);
        sections.set(
            SectionKind::ContextData,
            format!(
                "Working directory: {}. {} code file(s), {} document file(s). Dominant extensions: {}.",
                self.working_dir,
                composition.code_file_count,
                composition.document_file_count,
                composition.dominant_extensions.join(", ")
            ),
        );
        sections.set(
            SectionKind::OutputFormat,
            crate::schema::render_template(&code_fallback_schema(), OutputFormat::Xml),
        );

        let options = SingleOptions {
            sections,
            format: ParseFormat::Xml,
            required_fields: vec![],
            tools_enabled: true,
            progressive: false,
            completion_field: None,
            completion_values: Vec::new(),
        };
        let executor = FileToolboxExecutor {
            file_toolbox: self.file_toolbox,
        };

        let parsed = run_single(self.llm, Some(&executor), "code-search-fallback", options, &self.config)
            .await
            .map_err(llm_error_to_retrieval)?;

        Ok(dedupe_hits(parse_hits(&parsed)))
    }
}

fn llm_error_to_retrieval(e: Error) -> hcme_retrieval::Error {
    hcme_retrieval::Error::Fallback(e.to_string())
}

fn parse_hits(parsed: &Value) -> Vec<CodeHit> {
    let Some(hits) = parsed.get("hits").and_then(Value::as_array) else {
        return Vec::new();
    };
    hits.iter()
        .filter_map(|hit| {
            let file = hit.get("file")?.as_str()?.to_string();
            let start_line = hit.get("start_line").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0);
            let end_line = hit.get("end_line").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(start_line);
            let source = hit.get("source").and_then(Value::as_str).unwrap_or_default().to_string();
            Some(CodeHit {
                file,
                start_line,
                end_line,
                source,
                score: 1.0,
                confidence: 0.5,
            })
        })
        .collect()
}

/// Dedup by `(file, start_line)` (spec §4.9).
fn dedupe_hits(hits: Vec<CodeHit>) -> Vec<CodeHit> {
    let mut seen = std::collections::HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert((hit.file.clone(), hit.start_line)))
        .collect()
}
