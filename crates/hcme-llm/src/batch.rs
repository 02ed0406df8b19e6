//! Batch executor (spec §4.12): packs items into batches under a token
//! budget, runs them with a bounded fan-out, parses each response, and
//! merges results back onto their input items by index.

use crate::config::{ExecutorConfig, CHARS_PER_TOKEN};
use crate::error::{Error, Result};
use crate::parse::{parse_output, ParseFormat};
use futures::stream::{self, StreamExt};
use hcme_providers::LlmProvider;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct BatchItem<T> {
    pub text: String,
    pub payload: T,
}

#[derive(Debug, Clone)]
pub struct BatchOutput<T> {
    pub payload: T,
    pub parsed: Value,
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult<T> {
    pub outputs: Vec<BatchOutput<T>>,
    pub global_metadata: Option<Value>,
}

/// `prompt_builder` receives the items assigned to one batch (in order) and
/// must return a prompt whose response's `results` array lines up
/// positionally, optionally carrying an `index` field per spec §4.12's
/// "merges by index" wording — when present it is used to re-pair an
/// out-of-order result with its item; otherwise pairing falls back to
/// position.
pub async fn run_batch<T: Clone + Send + Sync>(
    llm: &dyn LlmProvider,
    items: Vec<BatchItem<T>>,
    prompt_builder: impl Fn(&[BatchItem<T>]) -> String,
    format: ParseFormat,
    request_id_prefix: &str,
    config: &ExecutorConfig,
) -> Result<BatchResult<T>> {
    let batches = partition_into_batches(items, config);

    let results = stream::iter(batches.into_iter().enumerate().map(|(batch_index, batch)| {
        let prompt = prompt_builder(&batch);
        let request_id = format!("{request_id_prefix}-batch-{batch_index}");
        async move {
            let response = llm.generate(&prompt, &request_id).await?;
            let parsed = parse_output(format, &response, &["results"])?;
            Ok::<_, Error>(merge_batch_output(&parsed, batch))
        }
    }))
    .buffer_unordered(config.batch_fanout.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut outputs = Vec::new();
    let mut global_metadata = None;
    for result in results {
        let (batch_outputs, metadata) = result?;
        outputs.extend(batch_outputs);
        if metadata.is_some() {
            global_metadata = metadata;
        }
    }

    Ok(BatchResult {
        outputs,
        global_metadata,
    })
}

fn partition_into_batches<T>(items: Vec<BatchItem<T>>, config: &ExecutorConfig) -> Vec<Vec<BatchItem<T>>> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut current_tokens = 0usize;

    for item in items {
        let item_tokens = item.text.len() / CHARS_PER_TOKEN.max(1) + 1;
        let would_overflow = !current.is_empty()
            && (current_tokens + item_tokens > config.batch_token_budget
                || current.len() >= config.batch_item_cap);
        if would_overflow {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current_tokens += item_tokens;
        current.push(item);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

fn merge_batch_output<T: Clone>(parsed: &Value, batch: Vec<BatchItem<T>>) -> (Vec<BatchOutput<T>>, Option<Value>) {
    let global_metadata = parsed.get("global_metadata").cloned();
    let empty = Vec::new();
    let results = parsed.get("results").and_then(Value::as_array).unwrap_or(&empty);

    let mut outputs = Vec::with_capacity(batch.len());
    for (position, item) in batch.into_iter().enumerate() {
        let matched = results
            .iter()
            .find(|r| r.get("index").and_then(Value::as_u64) == Some(position as u64))
            .or_else(|| results.get(position))
            .cloned()
            .unwrap_or(Value::Null);
        outputs.push(BatchOutput {
            payload: item.payload,
            parsed: matched,
        });
    }
    (outputs, global_metadata)
}
