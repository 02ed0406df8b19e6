use std::collections::HashMap;

use hcme_types::{Message, Role, ToolCall, ToolResult, Turn, TurnToolCall};

/// Reconstruct turns from a flat, timestamp-ordered message stream plus the
/// tool calls/results attached to it (spec §4.3).
///
/// A turn opens on a user message and absorbs every following non-user
/// message until the next user message (or end of stream), aggregating the
/// tool calls made by any assistant member along the way. A trailing user
/// message with no assistant response and no tool calls yet is discarded —
/// it has nothing to summarize.
pub fn messages_to_turns(
    messages: &[Message],
    tool_calls: &[(ToolCall, Option<ToolResult>)],
) -> Vec<Turn> {
    let mut calls_by_message: HashMap<&str, Vec<&(ToolCall, Option<ToolResult>)>> = HashMap::new();
    for entry in tool_calls {
        calls_by_message
            .entry(entry.0.message_id.as_str())
            .or_default()
            .push(entry);
    }

    let mut turns = Vec::new();
    let mut buffer = TurnBuffer::new(0);

    for message in messages {
        if message.role == Role::User {
            if let Some(turn) = buffer.flush() {
                turns.push(turn);
            }
            buffer = TurnBuffer::new(buffer.turn_index + if buffer.opened { 1 } else { 0 });
            buffer.open(message.clone());
            continue;
        }

        if !buffer.opened {
            // Assistant/system message with no preceding user message in this
            // reconstruction window; nothing to attach it to.
            continue;
        }

        if let Some(calls) = calls_by_message.get(message.uuid.as_str()) {
            for (call, result) in calls.iter().map(|c| (&c.0, &c.1)) {
                buffer.tool_calls.push(TurnToolCall {
                    call: call.clone(),
                    result: result.clone(),
                });
            }
        }
        buffer.assistant_members.push(message.clone());
    }

    if let Some(turn) = buffer.flush() {
        turns.push(turn);
    }

    turns
}

struct TurnBuffer {
    turn_index: u64,
    opened: bool,
    user: Option<Message>,
    assistant_members: Vec<Message>,
    tool_calls: Vec<TurnToolCall>,
}

impl TurnBuffer {
    fn new(turn_index: u64) -> Self {
        Self {
            turn_index,
            opened: false,
            user: None,
            assistant_members: Vec::new(),
            tool_calls: Vec::new(),
        }
    }

    fn open(&mut self, user: Message) {
        self.opened = true;
        self.user = Some(user);
    }

    fn flush(&mut self) -> Option<Turn> {
        let user = self.user.take()?;
        if self.assistant_members.is_empty() && self.tool_calls.is_empty() {
            return None;
        }

        let final_member = self
            .assistant_members
            .iter()
            .rev()
            .find(|m| !m.content.is_empty());
        let final_content = final_member.map(|m| m.content.clone()).unwrap_or_default();
        let reasoning = final_member.and_then(|m| m.reasoning.clone());
        let timestamp = self
            .assistant_members
            .last()
            .map(|m| m.timestamp)
            .unwrap_or(user.timestamp);

        Some(Turn {
            turn_index: self.turn_index,
            user,
            assistant_members: std::mem::take(&mut self.assistant_members),
            tool_calls: std::mem::take(&mut self.tool_calls),
            final_content,
            reasoning,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn msg(id: &str, role: Role, content: &str, offset_secs: i64) -> Message {
        let ts = Utc::now() + Duration::seconds(offset_secs);
        Message::new(id, "c1", role, content, None, ts)
    }

    #[test]
    fn single_user_assistant_pair_becomes_one_turn() {
        let messages = vec![
            msg("m1", Role::User, "hi", 0),
            msg("m2", Role::Assistant, "hello", 1),
        ];
        let turns = messages_to_turns(&messages, &[]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].final_content, "hello");
        assert_eq!(turns[0].turn_index, 0);
    }

    #[test]
    fn trailing_unanswered_user_message_is_discarded() {
        let messages = vec![
            msg("m1", Role::User, "hi", 0),
            msg("m2", Role::Assistant, "hello", 1),
            msg("m3", Role::User, "another question", 2),
        ];
        let turns = messages_to_turns(&messages, &[]);
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn multi_iteration_assistant_burst_picks_last_non_empty_content() {
        let messages = vec![
            msg("m1", Role::User, "do the thing", 0),
            msg("m2", Role::Assistant, "", 1),
            msg("m3", Role::Assistant, "done", 2),
        ];
        let turns = messages_to_turns(&messages, &[]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].final_content, "done");
        assert_eq!(turns[0].assistant_members.len(), 2);
    }

    #[test]
    fn tool_calls_attach_to_their_owning_assistant_message() {
        let messages = vec![
            msg("m1", Role::User, "search", 0),
            msg("m2", Role::Assistant, "found it", 1),
        ];
        let call = ToolCall::new("tc1", "m2", "Grep", "{}", Utc::now());
        let turns = messages_to_turns(&messages, &[(call, None)]);
        assert_eq!(turns[0].tool_calls.len(), 1);
    }

    #[test]
    fn turn_with_only_tool_calls_and_no_text_is_kept() {
        let messages = vec![
            msg("m1", Role::User, "run it", 0),
            msg("m2", Role::Assistant, "", 1),
        ];
        let call = ToolCall::new("tc1", "m2", "Bash", "{}", Utc::now());
        let turns = messages_to_turns(&messages, &[(call, None)]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].final_content, "");
    }

    #[test]
    fn two_separate_turns_get_sequential_indices() {
        let messages = vec![
            msg("m1", Role::User, "first", 0),
            msg("m2", Role::Assistant, "a1", 1),
            msg("m3", Role::User, "second", 2),
            msg("m4", Role::Assistant, "a2", 3),
        ];
        let turns = messages_to_turns(&messages, &[]);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn_index, 0);
        assert_eq!(turns[1].turn_index, 1);
    }
}
