//! Single/tool-calling executor (spec §4.12): an outer iteration loop with
//! inner tool-call rounds, progressive output accumulation, and tool-context
//! compaction on threshold.

use crate::compaction::compact_tool_context;
use crate::config::ExecutorConfig;
use crate::error::{Error, Result};
use crate::parse::{parse_output, ParseFormat};
use crate::prompt::PromptSections;
use async_trait::async_trait;
use futures::future::join_all;
use hcme_providers::LlmProvider;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
}

/// Drives one tool by name. Implemented per caller (e.g. the Code Searcher's
/// LLM-guided fallback over `FileToolbox`); core executor logic is tool-set
/// agnostic.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCallRequest) -> Result<String>;
}

pub struct SingleOptions {
    pub sections: PromptSections,
    pub format: ParseFormat,
    pub required_fields: Vec<String>,
    pub tools_enabled: bool,
    pub progressive: bool,
    pub completion_field: Option<String>,
    pub completion_values: Vec<String>,
}

/// `run_single` (spec §4.12). Termination: (a) a valid output is present and
/// (tools are disabled, or at least one tool ran this outer iteration, or
/// the text signals completion, or the iteration budget is exhausted) →
/// return it; (b) the iteration budget is exhausted without ever reaching
/// (a) → `Error::MaxIterationsExceeded`.
pub async fn run_single(
    llm: &dyn LlmProvider,
    tool_executor: Option<&dyn ToolExecutor>,
    request_id: &str,
    mut options: SingleOptions,
    config: &ExecutorConfig,
) -> Result<Value> {
    let mut tool_context = String::new();
    let mut accumulated: Option<Value> = None;

    for outer in 0..config.max_iterations {
        let mut tool_ran_this_outer = false;
        let mut parsed = Value::Null;

        for _inner in 0..config.max_tool_call_rounds {
            if !tool_context.is_empty() {
                options.sections.set(crate::prompt::SectionKind::ToolResults, tool_context.clone());
            }
            let prompt = options.sections.compose();
            let response = llm.generate(&prompt, request_id).await?;
            parsed = parse_output(options.format, &response, &as_str_refs(&options.required_fields))?;

            let calls = if options.tools_enabled {
                extract_tool_calls(&parsed)
            } else {
                Vec::new()
            };

            if calls.is_empty() {
                break;
            }

            let Some(executor) = tool_executor else {
                break;
            };

            let results = join_all(calls.iter().map(|call| executor.execute(call))).await;
            tool_ran_this_outer = true;
            for (call, result) in calls.iter().zip(results) {
                let output = result.unwrap_or_else(|e| format!("error: {e}"));
                tool_context.push_str(&format!("[{}] {}\n", call.name, output));
            }

            if tool_context.len() > config.tool_context_summarize_threshold_chars {
                tool_context = compact_tool_context(llm, &tool_context, request_id).await?;
            }
        }

        accumulated = Some(match accumulated.take() {
            Some(previous) if options.progressive => merge_progressive(previous, parsed),
            _ => parsed,
        });

        let current = accumulated.clone().unwrap_or(Value::Null);
        let is_valid = !current.is_null();
        let completion_signaled = completion_signaled(&current, &options);
        let last_iteration = outer + 1 >= config.max_iterations;

        if is_valid && (!options.tools_enabled || tool_ran_this_outer || completion_signaled || last_iteration) {
            return Ok(current);
        }
    }

    Err(Error::MaxIterationsExceeded)
}

fn as_str_refs(fields: &[String]) -> Vec<&str> {
    fields.iter().map(String::as_str).collect()
}

fn extract_tool_calls(parsed: &Value) -> Vec<ToolCallRequest> {
    let Some(calls) = parsed.get("tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };
    calls
        .iter()
        .filter_map(|call| {
            let name = call.get("name")?.as_str()?.to_string();
            let arguments = call.get("arguments").cloned().unwrap_or(Value::Object(Map::new()));
            Some(ToolCallRequest { name, arguments })
        })
        .collect()
}

fn completion_signaled(parsed: &Value, options: &SingleOptions) -> bool {
    let Some(field) = &options.completion_field else {
        return false;
    };
    let Some(value) = parsed.get(field).and_then(Value::as_str) else {
        return false;
    };
    options.completion_values.iter().any(|v| v == value)
}

fn merge_progressive(previous: Value, next: Value) -> Value {
    let (Value::Object(mut previous_map), Value::Object(next_map)) = (previous, next) else {
        return next_merge_fallback(next);
    };
    for (key, value) in next_map {
        match (previous_map.get(&key).cloned(), value) {
            (Some(Value::Array(mut existing)), Value::Array(incoming)) => {
                existing.extend(incoming);
                previous_map.insert(key, Value::Array(existing));
            }
            (_, value) => {
                previous_map.insert(key, value);
            }
        }
    }
    Value::Object(previous_map)
}

fn next_merge_fallback(next: Value) -> Value {
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{PromptSections, SectionKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, _prompt: &str, _request_id: &str) -> hcme_providers::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            Ok(if responses.is_empty() {
                "{}".to_string()
            } else {
                responses.remove(0)
            })
        }
    }

    struct EchoTool;

    #[async_trait]
    impl ToolExecutor for EchoTool {
        async fn execute(&self, call: &ToolCallRequest) -> Result<String> {
            Ok(format!("ran {}", call.name))
        }
    }

    fn base_options(required: &[&str]) -> SingleOptions {
        let mut sections = PromptSections::new(vec![SectionKind::SystemPrompt, SectionKind::ToolResults]);
        sections.set(SectionKind::SystemPrompt, "be terse");
        SingleOptions {
            sections,
            format: ParseFormat::Json,
            required_fields: required.iter().map(|s| s.to_string()).collect(),
            tools_enabled: true,
            progressive: false,
            completion_field: None,
            completion_values: Vec::new(),
        }
    }

    #[tokio::test]
    async fn returns_immediately_when_no_tool_calls_and_tools_disabled() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![r#"{"answer": "done"}"#.to_string()]),
            calls: AtomicUsize::new(0),
        };
        let mut options = base_options(&["answer"]);
        options.tools_enabled = false;
        let config = ExecutorConfig::default();

        let output = run_single(&llm, None, "req-1", options, &config).await.unwrap();
        assert_eq!(output["answer"], "done");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn executes_tool_calls_then_returns_final_output() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                r#"{"tool_calls": [{"name": "grep_files", "arguments": {}}]}"#.to_string(),
                r#"{"answer": "done"}"#.to_string(),
            ]),
            calls: AtomicUsize::new(0),
        };
        let tool = EchoTool;
        let options = base_options(&["answer"]);
        let config = ExecutorConfig::default();

        let output = run_single(&llm, Some(&tool), "req-1", options, &config).await.unwrap();
        assert_eq!(output["answer"], "done");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fails_with_max_iterations_exceeded_when_never_valid() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        };
        let mut options = base_options(&["answer"]);
        options.tools_enabled = false;
        let config = ExecutorConfig {
            max_iterations: 2,
            ..Default::default()
        };

        let err = run_single(&llm, None, "req-1", options, &config).await.unwrap_err();
        assert!(matches!(err, Error::MaxIterationsExceeded));
    }
}
