//! Context Builder (spec §4.10): fans recent turns, last user queries,
//! recent L1 summaries, multi-level semantic search, and code search out
//! under a partitioned character budget.

use crate::config::Config;
use crate::error::{Error, Result};
use hcme_engine::messages_to_turns;
use hcme_providers::{BrainRegistry, EmbeddingProvider, FileToolbox, GraphStore};
use hcme_retrieval::{
    search_code, search_conversation_history, CodeHit, CodeSearchFallback, CodeSearchOptions,
    ConfidenceTiers, SearchHit, SearchOptions,
};
use hcme_types::{Message, Summary, SummaryLevel, Turn};
use std::collections::HashMap;

/// Per-call knobs (spec §4.10: `skip_code_search`/`skip_history_search` let
/// a cheap query avoid the expensive paths).
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub skip_code_search: bool,
    pub skip_history_search: bool,
    pub working_dir: String,
    pub max_results: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            skip_code_search: false,
            skip_history_search: false,
            working_dir: String::new(),
            max_results: 10,
        }
    }
}

/// A semantic-search hit with its source content resolved (spec §4.8's
/// `SearchHit` only carries a node id; the Formatter needs the text).
#[derive(Debug, Clone)]
pub struct RenderedHit {
    pub level: u8,
    pub score: f32,
    pub confidence: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContextSections {
    pub last_user_queries: Vec<String>,
    pub recent_turns: Vec<Turn>,
    pub recent_l1_summaries: Vec<Summary>,
    pub semantic_hits: Vec<RenderedHit>,
    pub code_hits: Vec<CodeHit>,
}

/// Bundles every provider the Context Builder fans out to. Code-search
/// providers are optional: when any is absent, or `skip_code_search` is
/// set, the code-search source contributes nothing rather than erroring.
pub struct ContextBuilder<'a> {
    pub store: &'a dyn GraphStore,
    pub embedder: Option<&'a dyn EmbeddingProvider>,
    pub registry: Option<&'a dyn BrainRegistry>,
    pub file_toolbox: Option<&'a dyn FileToolbox>,
    pub code_fallback: Option<&'a dyn CodeSearchFallback>,
    pub config: Config,
}

impl<'a> ContextBuilder<'a> {
    pub async fn build(
        &self,
        conversation_id: &str,
        user_message: &str,
        options: &BuildOptions,
    ) -> Result<ContextSections> {
        let messages = self.store.get_messages(conversation_id, None, true).await?;
        let tool_calls = self.store.get_tool_calls(conversation_id).await?;
        let turns = messages_to_turns(&messages, &tool_calls);

        let last_user_queries = collect_last_user_queries(&turns, self.config.last_user_queries_budget());
        let recent_turns = collect_recent_turns(&turns, self.config.recent_turns_budget());

        let l1_summaries = self.store.get_summaries(conversation_id, SummaryLevel::L1).await?;
        let l2_summaries = self.store.get_summaries(conversation_id, SummaryLevel::L2).await?;
        let recent_l1_summaries =
            collect_recent_l1_summaries(l1_summaries.clone(), self.config.recent_l1_summaries_budget());

        let tiers = ConfidenceTiers::default();
        let (history_result, code_result) = futures::join!(
            self.search_history(conversation_id, user_message, options, &tiers),
            self.search_code(user_message, options, &tiers),
        );

        let semantic_hits = resolve_hits(history_result?, &messages, &l1_summaries, &l2_summaries);
        let code_hits = code_result?;

        Ok(ContextSections {
            last_user_queries,
            recent_turns,
            recent_l1_summaries,
            semantic_hits,
            code_hits,
        })
    }

    async fn search_history(
        &self,
        conversation_id: &str,
        user_message: &str,
        options: &BuildOptions,
        tiers: &ConfidenceTiers,
    ) -> Result<Vec<SearchHit>> {
        if options.skip_history_search {
            return Ok(Vec::new());
        }
        let search_options = SearchOptions {
            semantic: true,
            levels: vec![0, 1, 2],
            max_results: options.max_results,
            min_score: 0.0,
            include_turns: false,
        };
        search_conversation_history(
            self.store,
            self.embedder,
            conversation_id,
            user_message,
            &search_options,
            tiers,
        )
        .await
        .map_err(Error::from)
    }

    async fn search_code(
        &self,
        user_message: &str,
        options: &BuildOptions,
        tiers: &ConfidenceTiers,
    ) -> Result<Vec<CodeHit>> {
        if options.skip_code_search {
            return Ok(Vec::new());
        }
        let (Some(registry), Some(file_toolbox), Some(fallback)) =
            (self.registry, self.file_toolbox, self.code_fallback)
        else {
            return Ok(Vec::new());
        };

        let code_options = CodeSearchOptions {
            working_dir: options.working_dir.clone(),
            initial_limit: self.config.code_search_initial_limit,
            min_score: 0.0,
            char_budget: self.config.code_search_budget(),
        };
        search_code(
            self.store,
            self.embedder,
            registry,
            file_toolbox,
            fallback,
            user_message,
            &code_options,
            tiers,
        )
        .await
        .map_err(Error::from)
    }
}

/// Reverse-chronological user content only, truncated to `budget` (spec
/// §4.10's "Last User Queries" source).
fn collect_last_user_queries(turns: &[Turn], budget: usize) -> Vec<String> {
    let mut used = 0usize;
    let mut collected = Vec::new();
    for turn in turns.iter().rev() {
        let size = turn.user.content.chars().count();
        if used > 0 && used + size > budget {
            break;
        }
        used += size;
        collected.push(turn.user.content.clone());
        if used >= budget {
            break;
        }
    }
    collected
}

/// Most recent turn objects, full content, truncated to `budget` by
/// `Turn::weight()` (spec §4.10's "Recent Turns" source; §9 open question
/// resolved to share the same weight formula as the summarization trigger).
fn collect_recent_turns(turns: &[Turn], budget: usize) -> Vec<Turn> {
    let mut used = 0u64;
    let mut collected = Vec::new();
    for turn in turns.iter().rev() {
        let weight = turn.weight();
        if used > 0 && used + weight > budget as u64 {
            break;
        }
        used += weight;
        collected.push(turn.clone());
        if used >= budget as u64 {
            break;
        }
    }
    collected
}

/// Most recent L1 summaries (by `end_turn_index` desc) regardless of
/// whether an L2 has since consolidated them (spec §4.10).
fn collect_recent_l1_summaries(mut summaries: Vec<Summary>, budget: usize) -> Vec<Summary> {
    summaries.sort_by(|a, b| b.end_turn_index.cmp(&a.end_turn_index));
    let mut used = 0u64;
    let mut collected = Vec::new();
    for summary in summaries {
        let size = summary.summary_char_count;
        if used > 0 && used + size > budget as u64 {
            break;
        }
        used += size;
        collected.push(summary);
        if used >= budget as u64 {
            break;
        }
    }
    collected
}

/// Resolves each hit's node id back to its source text: L0 hits are message
/// uuids, L1/L2 hits are summary uuids (spec §4.8's id scheme).
fn resolve_hits(
    hits: Vec<SearchHit>,
    messages: &[Message],
    l1_summaries: &[Summary],
    l2_summaries: &[Summary],
) -> Vec<RenderedHit> {
    let messages_by_id: HashMap<&str, &Message> = messages.iter().map(|m| (m.uuid.as_str(), m)).collect();
    let l1_by_id: HashMap<&str, &Summary> = l1_summaries.iter().map(|s| (s.uuid.as_str(), s)).collect();
    let l2_by_id: HashMap<&str, &Summary> = l2_summaries.iter().map(|s| (s.uuid.as_str(), s)).collect();

    hits.into_iter()
        .filter_map(|hit| {
            let text = match hit.level {
                0 => messages_by_id.get(hit.node_id.as_str()).map(|m| m.content.clone())?,
                1 => l1_by_id.get(hit.node_id.as_str()).map(|s| render_summary(s))?,
                2 => l2_by_id.get(hit.node_id.as_str()).map(|s| render_summary(s))?,
                _ => return None,
            };
            Some(RenderedHit {
                level: hit.level,
                score: hit.score,
                confidence: hit.confidence,
                text,
            })
        })
        .collect()
}

fn render_summary(summary: &Summary) -> String {
    format!(
        "{} {}",
        summary.content.conversation_summary, summary.content.actions_summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hcme_types::Role;

    fn message(uuid: &str, role: Role, content: &str) -> Message {
        Message::new(uuid, "c1", role, content, None, Utc::now())
    }

    fn turn_with(index: u64, user_content: &str) -> Turn {
        Turn {
            turn_index: index,
            user: message(&format!("u{index}"), Role::User, user_content),
            assistant_members: vec![],
            tool_calls: vec![],
            final_content: String::new(),
            reasoning: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn collect_last_user_queries_stops_at_budget() {
        let turns = vec![turn_with(0, "short"), turn_with(1, "x".repeat(20).as_str())];
        let collected = collect_last_user_queries(&turns, 10);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0], "x".repeat(20));
    }

    #[test]
    fn collect_recent_l1_summaries_orders_by_end_turn_index_desc() {
        let now = Utc::now();
        let early = Summary::new(
            "s1",
            "c1",
            SummaryLevel::L1,
            hcme_types::SummaryContent {
                conversation_summary: "early".to_string(),
                actions_summary: String::new(),
            },
            0,
            5,
            0,
            50,
            now,
            vec![],
        );
        let late = Summary::new(
            "s2",
            "c1",
            SummaryLevel::L1,
            hcme_types::SummaryContent {
                conversation_summary: "late".to_string(),
                actions_summary: String::new(),
            },
            6,
            10,
            50,
            100,
            now,
            vec![],
        );
        let collected = collect_recent_l1_summaries(vec![early, late], 1000);
        assert_eq!(collected[0].uuid, "s2");
        assert_eq!(collected[1].uuid, "s1");
    }

    #[test]
    fn resolve_hits_maps_level_zero_to_message_content() {
        let messages = vec![message("m1", Role::User, "hello there")];
        let hits = vec![SearchHit {
            node_id: "m1".to_string(),
            level: 0,
            score: 0.9,
            confidence: 1.0,
        }];
        let rendered = resolve_hits(hits, &messages, &[], &[]);
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].text, "hello there");
    }

    /// Without a registered project/file toolbox/fallback, code search
    /// contributes nothing but the rest of the context still assembles
    /// (spec §4.9's guard degrading gracefully rather than erroring).
    #[tokio::test]
    async fn build_degrades_to_no_code_hits_without_code_search_providers() {
        let store = hcme_store::SqliteGraphStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .create_conversation(&hcme_types::Conversation::new("c1", "t", now))
            .await
            .unwrap();
        store
            .store_message(&message("u0", Role::User, "what does this do?"), &[])
            .await
            .unwrap();
        store
            .store_message(&message("a0", Role::Assistant, "it does a thing"), &[])
            .await
            .unwrap();

        let builder = ContextBuilder {
            store: &store,
            embedder: None,
            registry: None,
            file_toolbox: None,
            code_fallback: None,
            config: Config::default(),
        };

        let sections = builder
            .build("c1", "what does this do?", &BuildOptions::default())
            .await
            .unwrap();

        assert!(sections.code_hits.is_empty());
        assert!(!sections.last_user_queries.is_empty());
        assert!(!sections.recent_turns.is_empty());
    }
}
