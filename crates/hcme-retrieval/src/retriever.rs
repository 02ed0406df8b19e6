//! Semantic Retriever (spec §4.8): per-level vector search over a
//! conversation's embedded nodes, with a linear-scan fallback when a named
//! vector index does not exist.

use crate::confidence::ConfidenceTiers;
use crate::error::Result;
use hcme_providers::{EmbeddingProvider, Error as ProviderError, GraphStore, VectorIndex, VectorMatch};
use hcme_types::SummaryLevel;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub semantic: bool,
    pub levels: Vec<u8>,
    pub max_results: usize,
    pub min_score: f32,
    pub include_turns: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            semantic: true,
            levels: vec![0, 1, 2],
            max_results: 10,
            min_score: 0.0,
            include_turns: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub node_id: String,
    pub level: u8,
    pub score: f32,
    pub confidence: f32,
}

/// `search_conversation_history(conversation_id, query, options)` (spec
/// §4.8). Returns an empty result, not an error, when `semantic` is false or
/// no embedder is configured.
pub async fn search_conversation_history(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    conversation_id: &str,
    query: &str,
    options: &SearchOptions,
    tiers: &ConfidenceTiers,
) -> Result<Vec<SearchHit>> {
    if !options.semantic {
        return Ok(Vec::new());
    }
    let Some(embedder) = embedder else {
        return Ok(Vec::new());
    };
    let Ok(query_vector) = embedder.embed_single(query).await else {
        return Ok(Vec::new());
    };

    let top_k = (3 * options.max_results).min(100);
    let mut hits = Vec::new();

    for &level in &options.levels {
        let Some((index, level_filter, confidence)) = level_plan(level, tiers) else {
            continue;
        };

        let matches = match store
            .vector_query(Some(conversation_id), index, &query_vector, top_k, level_filter)
            .await
        {
            Ok(matches) => matches,
            Err(ProviderError::VectorIndexNotFound(_)) => {
                linear_scan(store, conversation_id, index, level_filter, &query_vector, top_k).await?
            }
            Err(e) => return Err(e.into()),
        };

        hits.extend(
            matches
                .into_iter()
                .filter(|m| m.score >= options.min_score)
                .map(|m| SearchHit {
                    node_id: m.uuid,
                    level,
                    score: m.score,
                    confidence,
                }),
        );
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(options.max_results);
    Ok(hits)
}

fn level_plan(level: u8, tiers: &ConfidenceTiers) -> Option<(VectorIndex, Option<SummaryLevel>, f32)> {
    match level {
        0 => Some((VectorIndex::MessageEmbedding, None, tiers.l0)),
        1 => Some((VectorIndex::SummaryEmbedding, Some(SummaryLevel::L1), tiers.l1)),
        2 => Some((VectorIndex::SummaryEmbedding, Some(SummaryLevel::L2), tiers.l2)),
        _ => None,
    }
}

async fn linear_scan(
    store: &dyn GraphStore,
    conversation_id: &str,
    index: VectorIndex,
    level_filter: Option<SummaryLevel>,
    query_vector: &[f32],
    top_k: usize,
) -> Result<Vec<VectorMatch>> {
    let nodes = store
        .all_embedded_nodes(conversation_id, index, level_filter)
        .await?;
    let mut scored: Vec<VectorMatch> = nodes
        .into_iter()
        .map(|(uuid, embedding)| VectorMatch {
            uuid,
            score: cosine_similarity(query_vector, &embedding),
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    Ok(scored)
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

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hcme_providers::{CodeUnit, RelationType};
    use hcme_store::SqliteGraphStore;
    use hcme_types::{Conversation, ConversationStatus, Message, Role, Summary, ToolCall, ToolResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeEmbedder {
        vectors: Mutex<HashMap<String, Vec<f32>>>,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                vectors: Mutex::new(HashMap::new()),
            }
        }

        fn set(&self, text: &str, vector: Vec<f32>) {
            self.vectors.lock().unwrap().insert(text.to_string(), vector);
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed_single(&self, text: &str) -> hcme_providers::Result<Vec<f32>> {
            Ok(self
                .vectors
                .lock()
                .unwrap()
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0, 0.0]))
        }
    }

    /// Wraps an in-memory store but reports every vector index as missing,
    /// forcing callers onto the linear-scan fallback path (spec §4.8).
    struct NoIndexStore {
        inner: SqliteGraphStore,
    }

    #[async_trait]
    impl GraphStore for NoIndexStore {
        async fn create_conversation(&self, conversation: &Conversation) -> hcme_providers::Result<()> {
            self.inner.create_conversation(conversation).await
        }
        async fn get_conversation(&self, id: &str) -> hcme_providers::Result<Option<Conversation>> {
            self.inner.get_conversation(id).await
        }
        async fn update_conversation(&self, conversation: &Conversation) -> hcme_providers::Result<()> {
            self.inner.update_conversation(conversation).await
        }
        async fn delete_conversation(&self, id: &str) -> hcme_providers::Result<()> {
            self.inner.delete_conversation(id).await
        }
        async fn store_message(&self, message: &Message, tool_calls: &[ToolCall]) -> hcme_providers::Result<()> {
            self.inner.store_message(message, tool_calls).await
        }
        async fn get_messages(
            &self,
            conversation_id: &str,
            limit: Option<usize>,
            include_tool_calls: bool,
        ) -> hcme_providers::Result<Vec<Message>> {
            self.inner
                .get_messages(conversation_id, limit, include_tool_calls)
                .await
        }
        async fn increment_counters(&self, conversation_id: &str, char_delta: u64) -> hcme_providers::Result<()> {
            self.inner.increment_counters(conversation_id, char_delta).await
        }
        async fn get_tool_calls(
            &self,
            conversation_id: &str,
        ) -> hcme_providers::Result<Vec<(ToolCall, Option<ToolResult>)>> {
            self.inner.get_tool_calls(conversation_id).await
        }
        async fn store_summary(&self, summary: &Summary) -> hcme_providers::Result<()> {
            self.inner.store_summary(summary).await
        }
        async fn get_summaries(
            &self,
            conversation_id: &str,
            level: hcme_types::SummaryLevel,
        ) -> hcme_providers::Result<Vec<Summary>> {
            self.inner.get_summaries(conversation_id, level).await
        }
        async fn update_embedding(&self, node_id: &str, embedding: Vec<f32>) -> hcme_providers::Result<()> {
            self.inner.update_embedding(node_id, embedding).await
        }
        async fn merge_edges(
            &self,
            relation: RelationType,
            from: &str,
            to_many: &[String],
        ) -> hcme_providers::Result<()> {
            self.inner.merge_edges(relation, from, to_many).await
        }
        async fn vector_query(
            &self,
            _conversation_id: Option<&str>,
            index: VectorIndex,
            _vector: &[f32],
            _top_k: usize,
            _level_filter: Option<SummaryLevel>,
        ) -> hcme_providers::Result<Vec<VectorMatch>> {
            Err(ProviderError::VectorIndexNotFound(index.name().to_string()))
        }
        async fn all_embedded_nodes(
            &self,
            conversation_id: &str,
            index: VectorIndex,
            level_filter: Option<SummaryLevel>,
        ) -> hcme_providers::Result<Vec<(String, Vec<f32>)>> {
            self.inner
                .all_embedded_nodes(conversation_id, index, level_filter)
                .await
        }
        async fn get_code_units(&self, uuids: &[String]) -> hcme_providers::Result<Vec<CodeUnit>> {
            self.inner.get_code_units(uuids).await
        }
    }

    async fn seed_message(store: &dyn GraphStore, conversation_id: &str, uuid: &str, content: &str, embedding: Vec<f32>) {
        store
            .create_conversation(&Conversation {
                uuid: conversation_id.to_string(),
                title: "t".to_string(),
                tags: Default::default(),
                created_at: chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                    .unwrap()
                    .into(),
                updated_at: chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                    .unwrap()
                    .into(),
                message_count: 0,
                total_chars: 0,
                status: ConversationStatus::Active,
            })
            .await
            .ok();
        store
            .store_message(
                &Message {
                    uuid: uuid.to_string(),
                    conversation_id: conversation_id.to_string(),
                    role: Role::User,
                    content: content.to_string(),
                    reasoning: None,
                    timestamp: chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                        .unwrap()
                        .into(),
                    char_count: content.len() as u64,
                    embedding: None,
                },
                &[],
            )
            .await
            .unwrap();
        store.update_embedding(uuid, embedding).await.unwrap();
    }

    #[tokio::test]
    async fn returns_empty_when_semantic_is_false() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let embedder = FakeEmbedder::new();
        let options = SearchOptions {
            semantic: false,
            ..Default::default()
        };
        let hits = search_conversation_history(
            &store,
            Some(&embedder),
            "conv-1",
            "query",
            &options,
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn returns_empty_when_no_embedder_configured() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let hits = search_conversation_history(
            &store,
            None,
            "conv-1",
            "query",
            &SearchOptions::default(),
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn ranks_direct_vector_query_hits_with_l0_confidence() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        seed_message(&store, "conv-1", "msg-1", "alpha", vec![1.0, 0.0]).await;
        seed_message(&store, "conv-1", "msg-2", "beta", vec![0.0, 1.0]).await;

        let embedder = FakeEmbedder::new();
        embedder.set("query", vec![1.0, 0.0]);

        let options = SearchOptions {
            levels: vec![0],
            ..Default::default()
        };
        let hits = search_conversation_history(
            &store,
            Some(&embedder),
            "conv-1",
            "query",
            &options,
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();

        assert_eq!(hits[0].node_id, "msg-1");
        assert_eq!(hits[0].confidence, 1.0);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn falls_back_to_linear_scan_when_index_missing() {
        let inner = SqliteGraphStore::open_in_memory().unwrap();
        seed_message(&inner, "conv-1", "msg-1", "alpha", vec![1.0, 0.0]).await;
        let store = NoIndexStore { inner };

        let embedder = FakeEmbedder::new();
        embedder.set("query", vec![1.0, 0.0]);

        let options = SearchOptions {
            levels: vec![0],
            ..Default::default()
        };
        let hits = search_conversation_history(
            &store,
            Some(&embedder),
            "conv-1",
            "query",
            &options,
            &ConfidenceTiers::default(),
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, "msg-1");
    }
}
