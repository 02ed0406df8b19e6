use crate::message::Message;
use crate::tool::{ToolCall, ToolResult};
use chrono::{DateTime, Utc};

/// A single tool call paired with its result, in call order, for one turn.
#[derive(Debug, Clone)]
pub struct TurnToolCall {
    pub call: ToolCall,
    pub result: Option<ToolResult>,
}

/// A reconstructed turn: a user message followed by the entire
/// assistant/tool-call burst up to (but excluding) the next user message
/// (spec §3, §4.3). Turns are not persisted; they are recomputed on demand
/// from stored messages/tool calls.
#[derive(Debug, Clone)]
pub struct Turn {
    /// 0-based index of this turn within its conversation, counted by the
    /// number of user messages seen so far.
    pub turn_index: u64,
    pub user: Message,
    /// All non-user messages belonging to this turn, in timestamp order.
    /// Captures multi-iteration agent responses where several assistant
    /// records are interleaved with tool calls (spec §4.3).
    pub assistant_members: Vec<Message>,
    /// Tool calls made by any assistant member, in call order.
    pub tool_calls: Vec<TurnToolCall>,
    /// The last non-empty assistant content within the group (spec §4.3).
    pub final_content: String,
    /// Reasoning of the same member as `final_content`.
    pub reasoning: Option<String>,
    /// Timestamp of the last assistant member.
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// `turn_weight(turn) = |user.content| + |user.reasoning|
    ///   + Σ over assistant members m (|m.content| + |m.reasoning|)
    ///   + Σ over tool calls c (|c.tool_name| + |json(c.arguments)| + |json(c.result)| + |c.error|)`
    /// (spec §4.4). Empty results/errors contribute zero.
    ///
    /// This is the single source of truth for turn character weight; both
    /// the L1/L2 trigger path and the Context Builder's raw-turn display
    /// path call it, so the two paths can never diverge (spec §9 open
    /// question, resolved in DESIGN.md to "include reasoning everywhere").
    pub fn weight(&self) -> u64 {
        let mut total = self.user.char_count;
        for member in &self.assistant_members {
            total += member.char_count;
        }
        for tc in &self.tool_calls {
            total += tc.call.tool_name.chars().count() as u64;
            total += tc.call.arguments.chars().count() as u64;
            if let Some(result) = &tc.result {
                total += result.result.chars().count() as u64;
                total += result.error.as_deref().map(|e| e.chars().count()).unwrap_or(0) as u64;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn weight_matches_user_only_when_no_assistant_members() {
        let now = Utc::now();
        let user = Message::new("m1", "c1", Role::User, "hello there", None, now);
        let turn = Turn {
            turn_index: 0,
            user: user.clone(),
            assistant_members: vec![],
            tool_calls: vec![],
            final_content: String::new(),
            reasoning: None,
            timestamp: now,
        };
        assert_eq!(turn.weight(), user.char_count);
    }

    #[test]
    fn weight_includes_tool_call_and_result_text() {
        let now = Utc::now();
        let user = Message::new("m1", "c1", Role::User, "go", None, now);
        let call = ToolCall::new("t1", "m2", "Grep", "{\"pattern\":\"foo\"}", now);
        let result = ToolResult::new("r1", "t1", true, "match.rs:1", None, now);
        let expected = user.char_count
            + call.tool_name.chars().count() as u64
            + call.arguments.chars().count() as u64
            + result.result.chars().count() as u64;
        let turn = Turn {
            turn_index: 0,
            user,
            assistant_members: vec![],
            tool_calls: vec![TurnToolCall { call, result: Some(result) }],
            final_content: String::new(),
            reasoning: None,
            timestamp: now,
        };
        assert_eq!(turn.weight(), expected);
    }
}
