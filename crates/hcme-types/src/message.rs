use crate::conversation::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of the message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message within a conversation.
///
/// `uuid` is derived deterministically from `(conversation_id, ordinal, role)`
/// when not supplied by the caller (spec §4.2). `char_count` excludes
/// tool-call weight, which is accounted separately per `Turn` (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub uuid: NodeId,
    pub conversation_id: NodeId,
    pub role: Role,
    pub content: String,
    pub reasoning: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub char_count: u64,
    pub embedding: Option<Vec<f32>>,
}

impl Message {
    pub fn new(
        uuid: impl Into<String>,
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        reasoning: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let content = content.into();
        let char_count = char_count_of(&content, reasoning.as_deref());
        Self {
            uuid: uuid.into(),
            conversation_id: conversation_id.into(),
            role,
            content,
            reasoning,
            timestamp,
            char_count,
            embedding: None,
        }
    }
}

/// `char_count = len(content) + len(reasoning)` (spec §3, Message entity).
/// Uses `chars().count()` rather than byte length so that accounting is
/// stable across UTF-8 inputs, matching the display path in
/// `hcme-context::formatter`.
pub fn char_count_of(content: &str, reasoning: Option<&str>) -> u64 {
    let content_len = content.chars().count() as u64;
    let reasoning_len = reasoning.map(|r| r.chars().count()).unwrap_or(0) as u64;
    content_len + reasoning_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn char_count_sums_content_and_reasoning() {
        assert_eq!(char_count_of("hello", Some("because")), 5 + 7);
        assert_eq!(char_count_of("hello", None), 5);
    }

    #[test]
    fn char_count_uses_chars_not_bytes() {
        assert_eq!(char_count_of("héllo", None), 5);
    }

    #[test]
    fn new_derives_char_count() {
        let msg = Message::new("m1", "c1", Role::Assistant, "hi", Some("plan"), Utc::now());
        assert_eq!(msg.char_count, 6);
    }
}
