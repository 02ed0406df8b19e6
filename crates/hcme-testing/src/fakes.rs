//! In-memory stand-ins for the `GraphStore`/`EmbeddingProvider`/`LlmProvider`
//! contracts (spec §6), so summarization and retrieval logic can be
//! exercised without a real store or model.

use async_trait::async_trait;
use hcme_providers::{
    CodeUnit, EmbeddingProvider, Error, GraphStore, LlmProvider, RelationType, Result, VectorIndex, VectorMatch,
};
use hcme_types::{Conversation, Message, Summary, SummaryLevel, ToolCall, ToolResult};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, Vec<Message>>,
    tool_calls: HashMap<String, Vec<(ToolCall, Option<ToolResult>)>>,
    summaries: HashMap<String, Vec<Summary>>,
    embeddings: HashMap<String, Vec<f32>>,
    code_units: HashMap<String, CodeUnit>,
    edges: HashMap<(RelationType, String), Vec<String>>,
}

/// An in-memory `GraphStore` over plain `HashMap`s, grounded in
/// `hcme-store::SqliteGraphStore`'s table shapes but backed by memory for
/// fast unit tests. `simulate_missing_index` makes `vector_query` return
/// `Error::VectorIndexNotFound` for a given index, exercising the
/// Semantic Retriever's linear-scan fallback without a real store.
#[derive(Default)]
pub struct FakeGraphStore {
    state: Mutex<State>,
    missing_indexes: Mutex<HashSet<VectorIndex>>,
}

impl FakeGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulate_missing_index(&self, index: VectorIndex) {
        self.missing_indexes.lock().unwrap().insert(index);
    }

    /// Attaches a result to an already-stored tool call. `GraphStore` has no
    /// call for this (the trait only writes calls alongside their owning
    /// message); test fixtures that need a populated `ToolResult` reach for
    /// this directly instead.
    pub fn seed_tool_result(&self, tool_call_uuid: &str, result: ToolResult) {
        let mut state = self.state.lock().unwrap();
        for calls in state.tool_calls.values_mut() {
            if let Some(entry) = calls.iter_mut().find(|(call, _)| call.uuid == tool_call_uuid) {
                entry.1 = Some(result);
                return;
            }
        }
    }

    pub fn seed_code_unit(&self, unit: CodeUnit, embedding: Option<Vec<f32>>) {
        let mut state = self.state.lock().unwrap();
        if let Some(embedding) = embedding {
            state.embeddings.insert(unit.uuid.clone(), embedding);
        }
        state.code_units.insert(unit.uuid.clone(), unit);
    }

    fn node_embedding_for(state: &State, index: VectorIndex, conversation_id: Option<&str>) -> Vec<(String, Vec<f32>)> {
        match index {
            VectorIndex::MessageEmbedding => state
                .messages
                .get(conversation_id.unwrap_or_default())
                .into_iter()
                .flatten()
                .filter_map(|m| m.embedding.clone().map(|e| (m.uuid.clone(), e)))
                .collect(),
            VectorIndex::SummaryEmbedding => state
                .summaries
                .get(conversation_id.unwrap_or_default())
                .into_iter()
                .flatten()
                .filter_map(|s| s.embedding.clone().map(|e| (s.uuid.clone(), e)))
                .collect(),
            VectorIndex::ScopeEmbeddingContent => state
                .code_units
                .keys()
                .filter_map(|uuid| state.embeddings.get(uuid).map(|e| (uuid.clone(), e.clone())))
                .collect(),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.state.lock().unwrap().conversations.insert(conversation.uuid.clone(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self.state.lock().unwrap().conversations.get(conversation_id).cloned())
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.state.lock().unwrap().conversations.insert(conversation.uuid.clone(), conversation.clone());
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.conversations.remove(conversation_id);
        state.messages.remove(conversation_id);
        state.tool_calls.remove(conversation_id);
        state.summaries.remove(conversation_id);
        Ok(())
    }

    async fn store_message(&self, message: &Message, tool_calls: &[ToolCall]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.messages.entry(message.conversation_id.clone()).or_default().push(message.clone());
        let entry = state.tool_calls.entry(message.conversation_id.clone()).or_default();
        for call in tool_calls {
            entry.push((call.clone(), None));
        }
        Ok(())
    }

    async fn get_messages(&self, conversation_id: &str, limit: Option<usize>, include_tool_calls: bool) -> Result<Vec<Message>> {
        let state = self.state.lock().unwrap();
        let mut messages = state.messages.get(conversation_id).cloned().unwrap_or_default();
        if !include_tool_calls {
            let carriers: HashSet<&str> = state
                .tool_calls
                .get(conversation_id)
                .into_iter()
                .flatten()
                .map(|(call, _)| call.message_id.as_str())
                .collect();
            messages.retain(|m| !(m.content.is_empty() && carriers.contains(m.uuid.as_str())));
        }
        Ok(match limit {
            Some(limit) => messages.into_iter().rev().take(limit).rev().collect(),
            None => messages,
        })
    }

    async fn increment_counters(&self, _conversation_id: &str, _char_delta: u64) -> Result<()> {
        Ok(())
    }

    async fn get_tool_calls(&self, conversation_id: &str) -> Result<Vec<(ToolCall, Option<ToolResult>)>> {
        Ok(self.state.lock().unwrap().tool_calls.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn store_summary(&self, summary: &Summary) -> Result<()> {
        self.state.lock().unwrap().summaries.entry(summary.conversation_id.clone()).or_default().push(summary.clone());
        Ok(())
    }

    async fn get_summaries(&self, conversation_id: &str, level: SummaryLevel) -> Result<Vec<Summary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .get(conversation_id)
            .into_iter()
            .flatten()
            .filter(|s| s.level == level)
            .cloned()
            .collect())
    }

    async fn update_embedding(&self, node_id: &str, embedding: Vec<f32>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for messages in state.messages.values_mut() {
            if let Some(m) = messages.iter_mut().find(|m| m.uuid == node_id) {
                m.embedding = Some(embedding.clone());
            }
        }
        for summaries in state.summaries.values_mut() {
            if let Some(s) = summaries.iter_mut().find(|s| s.uuid == node_id) {
                s.embedding = Some(embedding.clone());
            }
        }
        state.embeddings.insert(node_id.to_string(), embedding);
        Ok(())
    }

    async fn merge_edges(&self, relation: RelationType, from: &str, to_many: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state.edges.entry((relation, from.to_string())).or_default();
        for to in to_many {
            if !entry.contains(to) {
                entry.push(to.clone());
            }
        }
        Ok(())
    }

    async fn vector_query(
        &self,
        conversation_id: Option<&str>,
        index: VectorIndex,
        vector: &[f32],
        top_k: usize,
        level_filter: Option<SummaryLevel>,
    ) -> Result<Vec<VectorMatch>> {
        if self.missing_indexes.lock().unwrap().contains(&index) {
            return Err(Error::VectorIndexNotFound(index.name().to_string()));
        }
        let state = self.state.lock().unwrap();
        let candidates = match (index, level_filter, conversation_id) {
            (VectorIndex::SummaryEmbedding, Some(level), Some(conversation_id)) => state
                .summaries
                .get(conversation_id)
                .into_iter()
                .flatten()
                .filter(|s| s.level == level)
                .filter_map(|s| s.embedding.clone().map(|e| (s.uuid.clone(), e)))
                .collect(),
            (VectorIndex::SummaryEmbedding, Some(level), None) => state
                .summaries
                .values()
                .flatten()
                .filter(|s| s.level == level)
                .filter_map(|s| s.embedding.clone().map(|e| (s.uuid.clone(), e)))
                .collect(),
            (_, _, Some(conversation_id)) => Self::node_embedding_for(&state, index, Some(conversation_id)),
            (_, _, None) => Self::node_embedding_for(&state, index, None)
                .into_iter()
                .chain(state.messages.keys().flat_map(|c| Self::node_embedding_for(&state, index, Some(c))))
                .collect::<Vec<_>>(),
        };
        let mut scored: Vec<VectorMatch> = candidates
            .into_iter()
            .map(|(uuid, embedding)| VectorMatch {
                uuid,
                score: cosine_similarity(vector, &embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn all_embedded_nodes(
        &self,
        conversation_id: &str,
        index: VectorIndex,
        level_filter: Option<SummaryLevel>,
    ) -> Result<Vec<(String, Vec<f32>)>> {
        let state = self.state.lock().unwrap();
        Ok(match (index, level_filter) {
            (VectorIndex::SummaryEmbedding, Some(level)) => state
                .summaries
                .get(conversation_id)
                .into_iter()
                .flatten()
                .filter(|s| s.level == level)
                .filter_map(|s| s.embedding.clone().map(|e| (s.uuid.clone(), e)))
                .collect(),
            _ => Self::node_embedding_for(&state, index, Some(conversation_id)),
        })
    }

    async fn get_code_units(&self, uuids: &[String]) -> Result<Vec<CodeUnit>> {
        let state = self.state.lock().unwrap();
        Ok(uuids.iter().filter_map(|uuid| state.code_units.get(uuid).cloned()).collect())
    }
}

/// A deterministic `EmbeddingProvider`: the vector is derived from the
/// text's bytes, so equal inputs always embed identically and the cosine
/// similarity of near-duplicate text stays high — enough to drive ranking
/// assertions without a real model.
pub struct FakeEmbeddingProvider {
    dims: usize,
}

impl FakeEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for FakeEmbeddingProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dims];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dims] += byte as f32;
        }
        Ok(vector)
    }
}

/// A canned/echo `LlmProvider`: pops the next response off a fixed queue,
/// repeating the last one once the queue is drained.
pub struct FakeLlmProvider {
    responses: Mutex<Vec<String>>,
}

impl FakeLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    pub fn echo() -> Self {
        Self::new(vec![])
    }
}

#[async_trait]
impl LlmProvider for FakeLlmProvider {
    async fn generate(&self, prompt: &str, _request_id: &str) -> Result<String> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(prompt.to_string());
        }
        if responses.len() == 1 {
            Ok(responses[0].clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hcme_types::Role;

    #[tokio::test]
    async fn store_message_and_get_messages_round_trips() {
        let store = FakeGraphStore::new();
        let conversation = Conversation::new("c1", "title", Utc::now());
        store.create_conversation(&conversation).await.unwrap();
        let message = Message::new("m1", "c1", Role::User, "hello", None, Utc::now());
        store.store_message(&message, &[]).await.unwrap();

        let messages = store.get_messages("c1", None, true).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
    }

    #[tokio::test]
    async fn get_messages_without_tool_calls_drops_empty_tool_call_carriers() {
        use hcme_types::ToolCall;

        let store = FakeGraphStore::new();
        store.create_conversation(&Conversation::new("c1", "t", Utc::now())).await.unwrap();
        store.store_message(&Message::new("m1", "c1", Role::User, "hi", None, Utc::now()), &[]).await.unwrap();

        let carrier = Message::new("m2", "c1", Role::Assistant, "", None, Utc::now());
        let call = ToolCall::new("tc1", "m2", "Grep", "{}", Utc::now());
        store.store_message(&carrier, std::slice::from_ref(&call)).await.unwrap();

        assert_eq!(store.get_messages("c1", None, true).await.unwrap().len(), 2);
        let without = store.get_messages("c1", None, false).await.unwrap();
        assert_eq!(without.len(), 1);
        assert_eq!(without[0].uuid, "m1");
    }

    #[tokio::test]
    async fn vector_query_reports_missing_index_when_simulated() {
        let store = FakeGraphStore::new();
        store.simulate_missing_index(VectorIndex::SummaryEmbedding);
        let result = store
            .vector_query(Some("c1"), VectorIndex::SummaryEmbedding, &[1.0], 5, Some(SummaryLevel::L1))
            .await;
        assert!(matches!(result, Err(Error::VectorIndexNotFound(_))));
    }

    #[tokio::test]
    async fn vector_query_ranks_by_cosine_similarity() {
        let store = FakeGraphStore::new();
        let conversation = Conversation::new("c1", "title", Utc::now());
        store.create_conversation(&conversation).await.unwrap();
        let mut close = Message::new("m1", "c1", Role::User, "a", None, Utc::now());
        close.embedding = Some(vec![1.0, 0.0]);
        let mut far = Message::new("m2", "c1", Role::User, "b", None, Utc::now());
        far.embedding = Some(vec![0.0, 1.0]);
        store.store_message(&close, &[]).await.unwrap();
        store.store_message(&far, &[]).await.unwrap();

        let hits = store
            .vector_query(Some("c1"), VectorIndex::MessageEmbedding, &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(hits[0].uuid, "m1");
    }

    #[tokio::test]
    async fn vector_query_scoped_to_one_conversation_ignores_the_other() {
        let store = FakeGraphStore::new();
        store.create_conversation(&Conversation::new("c1", "t", Utc::now())).await.unwrap();
        store.create_conversation(&Conversation::new("c2", "t", Utc::now())).await.unwrap();

        let mut m1 = Message::new("m1", "c1", Role::User, "a", None, Utc::now());
        m1.embedding = Some(vec![1.0, 0.0]);
        let mut m2 = Message::new("m2", "c2", Role::User, "b", None, Utc::now());
        m2.embedding = Some(vec![1.0, 0.0]);
        store.store_message(&m1, &[]).await.unwrap();
        store.store_message(&m2, &[]).await.unwrap();

        let hits = store
            .vector_query(Some("c1"), VectorIndex::MessageEmbedding, &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uuid, "m1");
    }

    #[tokio::test]
    async fn fake_embedding_provider_is_deterministic() {
        let provider = FakeEmbeddingProvider::default();
        let a = provider.embed_single("hello").await.unwrap();
        let b = provider.embed_single("hello").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fake_llm_provider_repeats_last_response() {
        let provider = FakeLlmProvider::new(vec!["one".to_string()]);
        assert_eq!(provider.generate("p", "r1").await.unwrap(), "one");
        assert_eq!(provider.generate("p", "r2").await.unwrap(), "one");
    }
}
