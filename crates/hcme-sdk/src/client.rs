use crate::error::Result;
use hcme_context::{BuildOptions, Config as ContextConfig, ContextBuilder, FormatOptions};
use hcme_engine::{run_l1_cycle, run_l2_cycle};
use hcme_llm::{ExecutorConfig, LlmCodeSearchFallback, LlmSummaryExecutor};
use hcme_providers::{BrainRegistry, EmbeddingProvider, FileToolbox, GraphStore, LlmProvider};
use hcme_runtime::Config as RuntimeConfig;
use hcme_types::Summary;

/// Wires the concrete providers together into one facade (spec §6's
/// external-interface traits, bound once per process/session).
pub struct Client {
    pub store: Box<dyn GraphStore>,
    pub embedder: Option<Box<dyn EmbeddingProvider>>,
    pub llm: Option<Box<dyn LlmProvider>>,
    pub registry: Option<Box<dyn BrainRegistry>>,
    pub file_toolbox: Option<Box<dyn FileToolbox>>,
    pub config: RuntimeConfig,
}

impl Client {
    pub fn new(store: Box<dyn GraphStore>, config: RuntimeConfig) -> Self {
        Self {
            store,
            embedder: None,
            llm: None,
            registry: None,
            file_toolbox: None,
            config,
        }
    }

    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_llm(mut self, llm: Box<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_registry(mut self, registry: Box<dyn BrainRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_file_toolbox(mut self, file_toolbox: Box<dyn FileToolbox>) -> Self {
        self.file_toolbox = Some(file_toolbox);
        self
    }

    pub fn conversation<'a>(&'a self, conversation_id: impl Into<String>) -> Conversation<'a> {
        Conversation {
            client: self,
            conversation_id: conversation_id.into(),
        }
    }

    fn executor_config(&self) -> ExecutorConfig {
        let defaults = ExecutorConfig::default();
        ExecutorConfig {
            batch_token_budget: defaults.batch_token_budget,
            batch_item_cap: defaults.batch_item_cap,
            batch_fanout: self.config.batch_fanout,
            max_iterations: self.config.max_iterations,
            max_tool_call_rounds: self.config.max_tool_call_rounds,
            tool_context_summarize_threshold_chars: self.config.tool_context_summarize_threshold_chars,
        }
    }
}

/// A single conversation bound to its client's providers: summarization
/// triggers and context assembly, all per spec §4.5/§4.10.
pub struct Conversation<'a> {
    client: &'a Client,
    conversation_id: String,
}

impl<'a> Conversation<'a> {
    /// Runs the L1 trigger check and, if crossed, generates the summary via
    /// the LLM executor (spec §4.5). Requires an `llm` provider; returns
    /// `Ok(None)` when no LLM is configured rather than erroring, since
    /// summarization is an optional enrichment on top of the raw log.
    pub async fn maybe_create_l1(&self, project_root: &str) -> Result<Option<Summary>> {
        let Some(llm) = self.client.llm.as_deref() else {
            return Ok(None);
        };
        let executor = LlmSummaryExecutor::new(llm, self.client.executor_config());
        let summary = run_l1_cycle(
            self.client.store.as_ref(),
            self.client.embedder.as_deref(),
            &executor,
            &self.conversation_id,
            project_root,
            self.client.config.l1_threshold_chars(),
        )
        .await;
        Ok(summary)
    }

    /// Runs the L2 trigger check and, if crossed, consolidates L1s into an
    /// L2 (spec §4.5).
    pub async fn maybe_create_l2(&self) -> Result<Option<Summary>> {
        let Some(llm) = self.client.llm.as_deref() else {
            return Ok(None);
        };
        let executor = LlmSummaryExecutor::new(llm, self.client.executor_config());
        let summary = run_l2_cycle(
            self.client.store.as_ref(),
            self.client.embedder.as_deref(),
            &executor,
            &self.conversation_id,
            self.client.config.l2_threshold_chars(),
        )
        .await;
        Ok(summary)
    }

    /// Builds and renders the full prompt context for `user_message` (spec
    /// §4.10/§4.11): recent turns, last queries, summaries, semantic search
    /// hits, and code search hits, partitioned by `Config`'s budget and
    /// rendered into one ordered string.
    pub async fn build_context(
        &self,
        user_message: &str,
        build_options: &BuildOptions,
        format_options: &FormatOptions,
    ) -> Result<String> {
        let context_config = ContextConfig {
            max_context_chars: self.client.config.max_context_chars,
            l1_threshold_percent: self.client.config.l1_threshold_percent,
            l2_threshold_percent: self.client.config.l2_threshold_percent,
            last_user_queries_percent: self.client.config.last_user_queries_percent,
            recent_turns_percent: self.client.config.recent_turns_percent,
            recent_l1_summaries_percent: self.client.config.recent_l1_summaries_percent,
            code_search_percent: self.client.config.code_search_percent,
            code_search_initial_limit: self.client.config.code_search_initial_limit,
        };

        let code_fallback = self.client.llm.as_deref().zip(self.client.file_toolbox.as_deref()).map(
            |(llm, file_toolbox)| LlmCodeSearchFallback {
                llm,
                file_toolbox,
                working_dir: build_options.working_dir.clone(),
                config: self.client.executor_config(),
            },
        );

        let builder = ContextBuilder {
            store: self.client.store.as_ref(),
            embedder: self.client.embedder.as_deref(),
            registry: self.client.registry.as_deref(),
            file_toolbox: self.client.file_toolbox.as_deref(),
            code_fallback: code_fallback.as_ref().map(|f| f as _),
            config: context_config,
        };

        let sections = builder.build(&self.conversation_id, user_message, build_options).await?;
        Ok(hcme_context::format_context(&sections, format_options))
    }
}
