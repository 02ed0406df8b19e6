use crate::error::Result;
use async_trait::async_trait;
use hcme_types::{Conversation, Message, Summary, SummaryLevel, ToolCall, ToolResult};
use serde_json::Value;
use std::time::Duration;

/// Node labels used in graph-store traversals (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    Conversation,
    Message,
    ToolCall,
    ToolResult,
    Summary,
    File,
    Scope,
}

/// Relation types the engine creates or traverses (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    HasMessage,
    MadeToolCall,
    ProducedResult,
    HasSummary,
    Summarizes,
    MentionsFile,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::HasMessage => "HAS_MESSAGE",
            RelationType::MadeToolCall => "MADE_TOOL_CALL",
            RelationType::ProducedResult => "PRODUCED_RESULT",
            RelationType::HasSummary => "HAS_SUMMARY",
            RelationType::Summarizes => "SUMMARIZES",
            RelationType::MentionsFile => "MENTIONS_FILE",
        }
    }
}

/// Named vector indexes the engine queries (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorIndex {
    MessageEmbedding,
    SummaryEmbedding,
    ScopeEmbeddingContent,
}

impl VectorIndex {
    pub fn name(self) -> &'static str {
        match self {
            VectorIndex::MessageEmbedding => "message_embedding_index",
            VectorIndex::SummaryEmbedding => "summary_embedding_index",
            VectorIndex::ScopeEmbeddingContent => "scope_embedding_content_vector",
        }
    }
}

/// A single vector-search hit, before confidence tagging is applied by the
/// caller (retriever/code searcher own that, it is level-dependent).
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub uuid: String,
    pub score: f32,
}

/// Kind of code unit, driving the Code Searcher's type boost (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeUnitType {
    MethodOrFunction,
    ArrowFunction,
    Class,
    InterfaceOrType,
    Variable,
    Property,
}

impl CodeUnitType {
    pub fn boost(self) -> f32 {
        match self {
            CodeUnitType::MethodOrFunction => 1.15,
            CodeUnitType::ArrowFunction => 1.10,
            CodeUnitType::Class => 1.05,
            CodeUnitType::InterfaceOrType => 1.00,
            CodeUnitType::Variable => 0.95,
            CodeUnitType::Property => 0.90,
        }
    }
}

/// A code unit (spec §4.9): a named scope produced by the (out-of-scope)
/// ingestion pipeline and already resident in the graph store. HCME only
/// reads these; it never creates or updates them.
#[derive(Debug, Clone)]
pub struct CodeUnit {
    pub uuid: String,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub source: String,
    pub unit_type: CodeUnitType,
}

/// Collapse the graph driver's integer-object-or-native numeric shapes into
/// plain JSON numbers, so every call site sees one representation (spec
/// §4.1: "Numeric properties ... pass through a single normalizer").
pub fn normalize_numeric(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(low) = map.get("low").and_then(Value::as_i64) {
                Value::from(low)
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

/// The graph-database gateway (spec §4.1, §6). `hcme-store::SqliteGraphStore`
/// is the reference implementation; a production deployment may provide a
/// real graph database behind this trait without touching the engine.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()>;
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;
    async fn update_conversation(&self, conversation: &Conversation) -> Result<()>;
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;

    async fn store_message(&self, message: &Message, tool_calls: &[ToolCall]) -> Result<()>;
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
        include_tool_calls: bool,
    ) -> Result<Vec<Message>>;
    async fn increment_counters(&self, conversation_id: &str, char_delta: u64) -> Result<()>;

    /// All tool calls for `conversation_id`, each paired with its result if
    /// one has been stored, in call order. Turn reconstruction (spec §4.3)
    /// zips these back onto their owning messages by `message_id`.
    async fn get_tool_calls(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<(ToolCall, Option<ToolResult>)>>;

    async fn store_summary(&self, summary: &Summary) -> Result<()>;
    async fn get_summaries(
        &self,
        conversation_id: &str,
        level: SummaryLevel,
    ) -> Result<Vec<Summary>>;
    async fn update_embedding(&self, node_id: &str, embedding: Vec<f32>) -> Result<()>;

    /// Create `relation` edges from `from` to each of `to_many`, idempotently.
    async fn merge_edges(
        &self,
        relation: RelationType,
        from: &str,
        to_many: &[String],
    ) -> Result<()>;

    /// Returns `Err(Error::VectorIndexNotFound)` when `index` does not exist
    /// so the retriever can fall back to a linear scan (spec §4.8).
    /// `conversation_id` scopes `MessageEmbedding`/`SummaryEmbedding` lookups
    /// to one conversation, the same way `all_embedded_nodes` already does;
    /// pass `None` for `ScopeEmbeddingContent`, since code units belong to a
    /// project, not a conversation.
    async fn vector_query(
        &self,
        conversation_id: Option<&str>,
        index: VectorIndex,
        vector: &[f32],
        top_k: usize,
        level_filter: Option<SummaryLevel>,
    ) -> Result<Vec<VectorMatch>>;

    /// All nodes under `conversation_id` carrying a non-null embedding for
    /// `index`, for the in-process cosine-similarity fallback. `level_filter`
    /// narrows `summary_embedding_index` to L1 or L2, mirroring
    /// `vector_query`'s filter so both paths return the same record shape
    /// (spec §4.8).
    async fn all_embedded_nodes(
        &self,
        conversation_id: &str,
        index: VectorIndex,
        level_filter: Option<SummaryLevel>,
    ) -> Result<Vec<(String, Vec<f32>)>>;

    /// Resolve `Scope` nodes (code units) by id, in no particular order
    /// (spec §4.9). Unknown ids are silently dropped rather than erroring.
    async fn get_code_units(&self, uuids: &[String]) -> Result<Vec<CodeUnit>>;
}

/// `embed_single(text) -> vector<f32>` (spec §6). Callers enforce the
/// 4 000-character soft cap and the skip-if-too-short rule; this trait only
/// does the embedding itself.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>>;
}

/// `generate(prompt, request_id) -> string` (spec §6). `request_id` is
/// carried through for tracing; no streaming is required.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str, request_id: &str) -> Result<String>;
}

/// A JSON-Schema-style tool declaration handed to a native tool-calling
/// provider or embedded into a prompt.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A single role/content turn sent to a native tool-calling provider.
#[derive(Debug, Clone)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

/// A tool call returned by a native tool-calling provider.
#[derive(Debug, Clone)]
pub struct NativeToolCall {
    pub name: String,
    pub arguments: Value,
    pub call_id: Option<String>,
}

/// Optional native tool-calling support (spec §6). When absent, the
/// Structured LLM Executor embeds tool schemas in the prompt and parses tool
/// calls out of the text response instead.
#[async_trait]
pub trait NativeToolProvider: Send + Sync {
    async fn call_with_tools(
        &self,
        messages: &[ProviderMessage],
        tool_defs: &[ToolDefinition],
    ) -> Result<Vec<NativeToolCall>>;
}

/// Metadata for one registered project (spec §6).
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub id: String,
    pub path: String,
    pub project_type: String,
}

/// A non-blocking advisory lock. The Context Builder polls `is_locked`
/// rather than waiting, so a held lock short-circuits straight to the
/// LLM-guided fallback (spec §5).
#[async_trait]
pub trait AdvisoryLock: Send + Sync {
    fn is_locked(&self) -> bool;
    async fn wait_for_unlock(&self, timeout: Duration) -> Result<()>;
}

/// The brain registry contract (spec §6): project lookup plus the two
/// advisory locks guarding code-semantic search.
#[async_trait]
pub trait BrainRegistry: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ProjectInfo>>;
    async fn find_project_by_path(&self, path: &str) -> Result<Option<ProjectInfo>>;
    fn get_ingestion_lock(&self) -> Box<dyn AdvisoryLock>;
    fn get_embedding_lock(&self) -> Box<dyn AdvisoryLock>;
}

/// One `grep_files` hit.
#[derive(Debug, Clone)]
pub struct GrepMatch {
    pub file: String,
    pub line: u64,
    pub text: String,
}

/// File-system utilities, consumed as tool definitions by the Code
/// Searcher's LLM-guided fallback only; core logic never calls this trait
/// directly (spec §6).
#[async_trait]
pub trait FileToolbox: Send + Sync {
    async fn grep_files(&self, pattern: &str, path: &str) -> Result<Vec<GrepMatch>>;
    async fn list_directory(&self, path: &str) -> Result<Vec<String>>;
    async fn glob_files(&self, pattern: &str, path: &str) -> Result<Vec<String>>;
    async fn read_file(&self, path: &str) -> Result<String>;
}
