use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Node id type. Identifiers are stable strings across the whole data model
/// (see `hcme_core::identity` for how they are derived).
pub type NodeId = String;

/// Lifecycle status of a `Conversation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Archived,
}

/// A conversation: the root node of one agent/user exchange.
///
/// `message_count` and `total_chars` are strictly monotonic for the lifetime
/// of the conversation (spec §3, I-nvariant on Conversation lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub uuid: NodeId,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u64,
    pub total_chars: u64,
    pub status: ConversationStatus,
}

impl Conversation {
    pub fn new(uuid: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            uuid: uuid.into(),
            title: title.into(),
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            total_chars: 0,
            status: ConversationStatus::Active,
        }
    }
}
