//! Read-only conversation health/progress rollup, not consulted by the
//! trigger logic (which re-derives its own cursor per §4.5). Grounded on
//! the teacher's `SessionDigest` ambient reporting idiom.

use crate::error::Result;
use hcme_providers::GraphStore;
use hcme_types::SummaryLevel;

#[derive(Debug, Clone)]
pub struct SummaryDigest {
    pub conversation_id: String,
    pub l1_count: usize,
    pub l2_count: usize,
    pub l1_chars_summarized: u64,
    pub l2_chars_summarized: u64,
    pub last_l1_char_end: u64,
    pub last_l2_char_end: u64,
}

pub async fn compute_digest(store: &dyn GraphStore, conversation_id: &str) -> Result<SummaryDigest> {
    let l1s = store.get_summaries(conversation_id, SummaryLevel::L1).await?;
    let l2s = store.get_summaries(conversation_id, SummaryLevel::L2).await?;

    let last_l1_char_end = l1s
        .iter()
        .max_by_key(|s| s.created_at)
        .map(|s| s.char_range_end)
        .unwrap_or(0);
    let last_l2_char_end = l2s
        .iter()
        .max_by_key(|s| s.created_at)
        .map(|s| s.char_range_end)
        .unwrap_or(0);

    Ok(SummaryDigest {
        conversation_id: conversation_id.to_string(),
        l1_count: l1s.len(),
        l2_count: l2s.len(),
        l1_chars_summarized: l1s.iter().map(|s| s.char_range_end - s.char_range_start).sum(),
        l2_chars_summarized: l2s.iter().map(|s| s.char_range_end - s.char_range_start).sum(),
        last_l1_char_end,
        last_l2_char_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcme_store::SqliteGraphStore;
    use hcme_types::{Conversation, Summary, SummaryContent};

    #[tokio::test]
    async fn digest_on_empty_conversation_is_all_zero() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .create_conversation(&Conversation::new("c1", "t", chrono::Utc::now()))
            .await
            .unwrap();

        let digest = compute_digest(&store, "c1").await.unwrap();
        assert_eq!(digest.l1_count, 0);
        assert_eq!(digest.l2_count, 0);
        assert_eq!(digest.last_l1_char_end, 0);
    }

    #[tokio::test]
    async fn digest_reflects_stored_l1_summary() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .create_conversation(&Conversation::new("c1", "t", chrono::Utc::now()))
            .await
            .unwrap();
        let summary = Summary::new(
            "s1",
            "c1",
            hcme_types::SummaryLevel::L1,
            SummaryContent {
                conversation_summary: "did things".to_string(),
                actions_summary: "ran tests".to_string(),
            },
            0,
            3,
            0,
            500,
            chrono::Utc::now(),
            vec![],
        );
        store.store_summary(&summary).await.unwrap();

        let digest = compute_digest(&store, "c1").await.unwrap();
        assert_eq!(digest.l1_count, 1);
        assert_eq!(digest.last_l1_char_end, 500);
        assert_eq!(digest.l1_chars_summarized, 500);
    }
}
