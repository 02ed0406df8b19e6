use crate::conversation::NodeId;
use crate::mention::{FileMention, NodeMention};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hierarchy level of a `Summary`. L1 summarizes turns (messages); L2
/// summarizes a contiguous run of L1 summaries (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SummaryLevel {
    L1 = 1,
    L2 = 2,
}

impl SummaryLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The two-part generated content of a summary (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryContent {
    pub conversation_summary: String,
    pub actions_summary: String,
}

impl SummaryContent {
    /// `summary_char_count = len(conversation_summary) + len(actions_summary)`
    /// (spec §3 invariant I2 / §8 property P4).
    pub fn char_count(&self) -> u64 {
        (self.conversation_summary.chars().count() + self.actions_summary.chars().count()) as u64
    }
}

/// A persisted L1 or L2 summary node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub uuid: NodeId,
    pub conversation_id: NodeId,
    pub level: SummaryLevel,
    pub content: SummaryContent,
    pub start_turn_index: u64,
    pub end_turn_index: u64,
    pub char_range_start: u64,
    pub char_range_end: u64,
    pub summary_char_count: u64,
    pub created_at: DateTime<Utc>,
    pub parent_summaries: Vec<NodeId>,
    pub embedding: Option<Vec<f32>>,
}

impl Summary {
    pub fn new(
        uuid: impl Into<String>,
        conversation_id: impl Into<String>,
        level: SummaryLevel,
        content: SummaryContent,
        start_turn_index: u64,
        end_turn_index: u64,
        char_range_start: u64,
        char_range_end: u64,
        created_at: DateTime<Utc>,
        parent_summaries: Vec<NodeId>,
    ) -> Self {
        let summary_char_count = content.char_count();
        Self {
            uuid: uuid.into(),
            conversation_id: conversation_id.into(),
            level,
            content,
            start_turn_index,
            end_turn_index,
            char_range_start,
            char_range_end,
            summary_char_count,
            created_at,
            parent_summaries,
            embedding: None,
        }
    }
}

/// Raw structured output expected from the Summary Generator's LLM call
/// (spec §4.6). Deserialized directly from the model's tool-call arguments;
/// `SummaryContent` and the mention lists are then persisted separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryGenerationOutput {
    pub conversation_summary: String,
    pub actions_summary: String,
    #[serde(default)]
    pub files_mentioned: Vec<FileMention>,
    #[serde(default)]
    pub nodes_mentioned: Vec<NodeMention>,
}

impl SummaryGenerationOutput {
    pub fn into_content(self) -> SummaryContent {
        SummaryContent {
            conversation_summary: self.conversation_summary,
            actions_summary: self.actions_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn summary_char_count_is_derived() {
        let content = SummaryContent {
            conversation_summary: "ab".to_string(),
            actions_summary: "cde".to_string(),
        };
        assert_eq!(content.char_count(), 5);

        let summary = Summary::new(
            "s1", "c1", SummaryLevel::L1, content, 0, 3, 0, 120, Utc::now(), vec![],
        );
        assert_eq!(summary.summary_char_count, 5);
    }

    #[test]
    fn level_ordering_matches_hierarchy() {
        assert!(SummaryLevel::L1 < SummaryLevel::L2);
        assert_eq!(SummaryLevel::L2.as_u8(), 2);
    }
}
