//! Summarization State Machine (spec §4.5) and Summary Generator
//! orchestration (spec §4.6).

use crate::error::Result;
use crate::mentions::{extract_mentions, ExtractedMentions};
use crate::turn::messages_to_turns;
use async_trait::async_trait;
use chrono::Utc;
use hcme_core::{file_id, summary_id};
use hcme_providers::{EmbeddingProvider, GraphStore, RelationType};
use hcme_types::{
    FileMention, NodeMention, NodeMentionKind, Summary, SummaryContent, SummaryGenerationOutput, SummaryLevel, Turn,
};
use std::collections::HashSet;

/// Invokes the Structured LLM Executor for one summary generation call
/// (spec §4.6). Defined at the point of use so the engine can orchestrate
/// summarization without depending on the executor crate's implementation;
/// `hcme-llm` provides the concrete executor.
#[async_trait]
pub trait SummaryExecutor: Send + Sync {
    async fn summarize_turns(
        &self,
        conversation_id: &str,
        turns: &[Turn],
    ) -> Result<SummaryGenerationOutput>;

    async fn summarize_summaries(
        &self,
        conversation_id: &str,
        summaries: &[Summary],
    ) -> Result<SummaryGenerationOutput>;
}

/// The turns/chars/indices selected for the next L1 summary by
/// `should_create_l1`.
#[derive(Debug)]
pub struct L1Candidate {
    pub turns: Vec<Turn>,
    pub start_turn_index: u64,
    pub end_turn_index: u64,
    pub char_range_start: u64,
    pub char_range_end: u64,
}

/// The L1 summaries selected for the next L2 summary by `should_create_l2`.
#[derive(Debug)]
pub struct L2Candidate {
    pub summaries: Vec<Summary>,
    pub char_range_start: u64,
    pub char_range_end: u64,
}

async fn load_cursor(
    store: &dyn GraphStore,
    conversation_id: &str,
    level: SummaryLevel,
) -> Result<(u64, i64)> {
    let summaries = store.get_summaries(conversation_id, level).await?;
    let latest = summaries.iter().max_by_key(|s| s.created_at);
    Ok(match latest {
        Some(s) => (s.char_range_end, s.end_turn_index as i64),
        None => match level {
            SummaryLevel::L1 => (0, -1),
            SummaryLevel::L2 => (0, 0),
        },
    })
}

/// `should_create_l1` (spec §4.5.1): stream turns accumulating
/// turn-weighted characters past the L1 cursor, stopping as soon as the
/// accumulated span crosses `threshold_chars`.
pub async fn should_create_l1(
    store: &dyn GraphStore,
    conversation_id: &str,
    threshold_chars: u64,
) -> Result<Option<L1Candidate>> {
    if threshold_chars == 0 {
        return Ok(None);
    }
    let (last_end, _last_turn) = load_cursor(store, conversation_id, SummaryLevel::L1).await?;
    let messages = store.get_messages(conversation_id, None, true).await?;
    let tool_calls = store.get_tool_calls(conversation_id).await?;
    let turns = messages_to_turns(&messages, &tool_calls);

    let mut pos: u64 = 0;
    let mut char_range_start: Option<u64> = None;
    let mut start_turn_index: Option<u64> = None;
    let mut end_turn_index = 0u64;
    let mut char_range_end = 0u64;
    let mut selected = Vec::new();

    for turn in turns {
        let pos_start = pos;
        pos += turn.weight();
        let pos_end = pos;

        if pos_end > last_end {
            if char_range_start.is_none() {
                char_range_start = Some(last_end.max(pos_start));
                start_turn_index = Some(turn.turn_index);
            }
            end_turn_index = turn.turn_index;
            char_range_end = pos_end;
            selected.push(turn);

            if char_range_end - char_range_start.unwrap() >= threshold_chars {
                break;
            }
        }
    }

    let current_chars = char_range_end.saturating_sub(char_range_start.unwrap_or(0));
    if !selected.is_empty() && current_chars >= threshold_chars {
        Ok(Some(L1Candidate {
            turns: selected,
            start_turn_index: start_turn_index.unwrap(),
            end_turn_index,
            char_range_start: char_range_start.unwrap(),
            char_range_end,
        }))
    } else {
        Ok(None)
    }
}

/// `should_create_l2` (spec §4.5.3): L1s not yet cited by any L2's
/// `parent_summaries`, sorted by `char_range_start`, accumulated until the
/// threshold is crossed. `load_cursor` is consulted per the spec's
/// procedure but the actual exclusion test is membership in `parent_summaries`,
/// not the cursor position.
pub async fn should_create_l2(
    store: &dyn GraphStore,
    conversation_id: &str,
    threshold_chars: u64,
) -> Result<Option<L2Candidate>> {
    if threshold_chars == 0 {
        return Ok(None);
    }
    let _cursor = load_cursor(store, conversation_id, SummaryLevel::L2).await?;
    let l1s = store.get_summaries(conversation_id, SummaryLevel::L1).await?;
    let l2s = store.get_summaries(conversation_id, SummaryLevel::L2).await?;

    let cited: HashSet<&str> = l2s
        .iter()
        .flat_map(|s| s.parent_summaries.iter().map(|p| p.as_str()))
        .collect();

    let mut candidates: Vec<Summary> = l1s
        .into_iter()
        .filter(|s| !cited.contains(s.uuid.as_str()))
        .collect();
    candidates.sort_by_key(|s| s.char_range_start);

    if candidates.len() < 2 {
        return Ok(None);
    }

    let mut accumulated = 0u64;
    let mut selected = Vec::new();
    for summary in candidates {
        accumulated += summary.summary_char_count;
        selected.push(summary);
        if accumulated >= threshold_chars {
            break;
        }
    }

    if selected.len() >= 2 && accumulated >= threshold_chars {
        let char_range_start = selected.first().unwrap().char_range_start;
        let char_range_end = selected.last().unwrap().char_range_end;
        Ok(Some(L2Candidate {
            summaries: selected,
            char_range_start,
            char_range_end,
        }))
    } else {
        Ok(None)
    }
}

/// L1 creation (spec §4.5.2): generate, persist, embed (best-effort), link
/// `SUMMARIZES` to every member message and `MENTIONS_FILE` to every
/// resolved file.
pub async fn create_l1(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    executor: &dyn SummaryExecutor,
    conversation_id: &str,
    project_root: &str,
    candidate: L1Candidate,
) -> Result<Summary> {
    let output = executor
        .summarize_turns(conversation_id, &candidate.turns)
        .await?;
    let harvested = harvest_turn_mentions(&candidate.turns);
    let files = merge_file_mentions(harvested.files, output.files_mentioned, project_root);
    let nodes = merge_node_mentions(harvested.nodes, output.nodes_mentioned);

    let uuid = summary_id(
        conversation_id,
        SummaryLevel::L1.as_u8(),
        candidate.start_turn_index,
        candidate.end_turn_index,
    );
    let content = SummaryContent {
        conversation_summary: output.conversation_summary,
        actions_summary: output.actions_summary,
    };
    let mut summary = Summary::new(
        uuid.clone(),
        conversation_id,
        SummaryLevel::L1,
        content,
        candidate.start_turn_index,
        candidate.end_turn_index,
        candidate.char_range_start,
        candidate.char_range_end,
        Utc::now(),
        vec![],
    );

    store.store_summary(&summary).await?;
    try_embed(store, embedder, &uuid, &mut summary).await;

    let member_ids: Vec<String> = candidate
        .turns
        .iter()
        .flat_map(|t| {
            let mut ids = vec![t.user.uuid.clone()];
            ids.extend(t.assistant_members.iter().map(|m| m.uuid.clone()));
            ids
        })
        .collect();
    store
        .merge_edges(RelationType::Summarizes, &uuid, &member_ids)
        .await?;

    let mut file_ids: Vec<String> = files
        .iter()
        .map(|f| file_id(&canonical_key(&f.path, project_root)))
        .collect();
    // `[file:UUID]` mentions already name a File node directly; fold them in
    // alongside path-derived ones rather than discarding the merged list.
    file_ids.extend(
        nodes
            .into_iter()
            .filter(|n| n.kind == NodeMentionKind::File)
            .map(|n| n.uuid),
    );
    file_ids.sort();
    file_ids.dedup();

    if !file_ids.is_empty() {
        store
            .merge_edges(RelationType::MentionsFile, &uuid, &file_ids)
            .await?;
    }

    Ok(summary)
}

/// L2 creation (spec §4.5.4): same shape as L1 but over summaries, with
/// `parent_summaries` set to the selected L1 uuids and `SUMMARIZES` edges
/// pointing Summary→Summary.
pub async fn create_l2(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    executor: &dyn SummaryExecutor,
    conversation_id: &str,
    candidate: L2Candidate,
) -> Result<Summary> {
    let output = executor
        .summarize_summaries(conversation_id, &candidate.summaries)
        .await?;

    let start_turn_index = candidate
        .summaries
        .first()
        .map(|s| s.start_turn_index)
        .unwrap_or(0);
    let end_turn_index = candidate
        .summaries
        .last()
        .map(|s| s.end_turn_index)
        .unwrap_or(0);
    let parent_ids: Vec<String> = candidate.summaries.iter().map(|s| s.uuid.clone()).collect();

    let uuid = summary_id(
        conversation_id,
        SummaryLevel::L2.as_u8(),
        start_turn_index,
        end_turn_index,
    );
    let content = SummaryContent {
        conversation_summary: output.conversation_summary,
        actions_summary: output.actions_summary,
    };
    let mut summary = Summary::new(
        uuid.clone(),
        conversation_id,
        SummaryLevel::L2,
        content,
        start_turn_index,
        end_turn_index,
        candidate.char_range_start,
        candidate.char_range_end,
        Utc::now(),
        parent_ids.clone(),
    );

    store.store_summary(&summary).await?;
    try_embed(store, embedder, &uuid, &mut summary).await;
    store
        .merge_edges(RelationType::Summarizes, &uuid, &parent_ids)
        .await?;

    Ok(summary)
}

/// Embedding failures are non-fatal (spec §4.5.5): the summary is already
/// persisted without one, and search falls back to the linear path.
async fn try_embed(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    uuid: &str,
    summary: &mut Summary,
) {
    let Some(embedder) = embedder else { return };
    let text = format!(
        "{} {}",
        summary.content.conversation_summary, summary.content.actions_summary
    );
    if let Ok(vector) = embedder.embed_single(&text).await {
        if store.update_embedding(uuid, vector.clone()).await.is_ok() {
            summary.embedding = Some(vector);
        }
    }
}

/// Run one L1 trigger-and-create cycle. Any failure anywhere in the chain
/// is swallowed into `None`; the next call retries from the same cursor
/// since the unsummarized content hasn't moved and ids are deterministic
/// (spec §4.5.5).
pub async fn run_l1_cycle(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    executor: &dyn SummaryExecutor,
    conversation_id: &str,
    project_root: &str,
    threshold_chars: u64,
) -> Option<Summary> {
    let candidate = should_create_l1(store, conversation_id, threshold_chars)
        .await
        .ok()??;
    create_l1(store, embedder, executor, conversation_id, project_root, candidate)
        .await
        .ok()
}

/// Run one L2 trigger-and-create cycle, with the same failure semantics as
/// `run_l1_cycle`.
pub async fn run_l2_cycle(
    store: &dyn GraphStore,
    embedder: Option<&dyn EmbeddingProvider>,
    executor: &dyn SummaryExecutor,
    conversation_id: &str,
    threshold_chars: u64,
) -> Option<Summary> {
    let candidate = should_create_l2(store, conversation_id, threshold_chars)
        .await
        .ok()??;
    create_l2(store, embedder, executor, conversation_id, candidate)
        .await
        .ok()
}

fn harvest_turn_mentions(turns: &[Turn]) -> ExtractedMentions {
    let pairs = turns
        .iter()
        .flat_map(|t| t.tool_calls.iter().map(|tc| (&tc.call, tc.result.as_ref())));
    extract_mentions(pairs)
}

/// Union-dedup harvested and LLM-proposed file mentions by canonical path;
/// `is_absolute` is always recomputed from the path, never taken from the
/// LLM (spec §4.6).
fn merge_file_mentions(
    mut harvested: Vec<FileMention>,
    llm_proposed: Vec<FileMention>,
    project_root: &str,
) -> Vec<FileMention> {
    let mut seen: HashSet<String> = harvested.iter().map(|f| canonical_key(&f.path, project_root)).collect();
    for mention in llm_proposed {
        let recomputed = FileMention::from_path(mention.path);
        let key = canonical_key(&recomputed.path, project_root);
        if seen.insert(key) {
            harvested.push(recomputed);
        }
    }
    harvested
}

fn merge_node_mentions(mut harvested: Vec<NodeMention>, llm_proposed: Vec<NodeMention>) -> Vec<NodeMention> {
    let mut seen: HashSet<String> = harvested.iter().map(|n| n.uuid.clone()).collect();
    for mention in llm_proposed {
        if seen.insert(mention.uuid.clone()) {
            harvested.push(mention);
        }
    }
    harvested
}

/// Collapse a mention path to one stable key so the same file, however it
/// was spelled, lands on one `File` node. Tries the path relative to
/// `project_root`, then the path without a leading slash (spec §4.7: "exact
/// path, path without leading slash, and path relative to the project root;
/// the first match wins" — the project-relative form is the most specific
/// and is preferred when derivable, since it is what both an absolute and a
/// relative mention of the same file collapse onto).
fn canonical_key(path: &str, project_root: &str) -> String {
    let no_slash = path.trim_start_matches('/');
    if !project_root.is_empty() {
        let root = project_root.trim_end_matches('/');
        let root_no_slash = root.trim_start_matches('/');
        for candidate in [path, no_slash] {
            if let Some(rest) = candidate.strip_prefix(root).or_else(|| candidate.strip_prefix(root_no_slash)) {
                let rest = rest.trim_start_matches('/');
                if !rest.is_empty() {
                    return rest.to_string();
                }
            }
        }
    }
    no_slash.to_string()
}
