/// Heuristic token estimate: characters / 4 (spec §4.12).
pub const CHARS_PER_TOKEN: usize = 4;

/// Executor-wide tunables (spec §4.12, §6's `Config` record).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub batch_token_budget: usize,
    pub batch_item_cap: usize,
    pub batch_fanout: usize,
    pub max_iterations: usize,
    pub max_tool_call_rounds: usize,
    pub tool_context_summarize_threshold_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_token_budget: 8_000,
            batch_item_cap: 50,
            batch_fanout: 5,
            max_iterations: 10,
            max_tool_call_rounds: 10,
            tool_context_summarize_threshold_chars: 50_000,
        }
    }
}
