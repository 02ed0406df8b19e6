//! Fluent conversation construction for tests (spec A.4), mirroring the
//! teacher's `TestWorldBuilder` fluent style but building turns/messages
//! instead of CLI fixtures.

use crate::fakes::FakeGraphStore;
use chrono::Utc;
use hcme_providers::GraphStore;
use hcme_types::{Conversation, Message, Role, ToolCall, ToolResult};

pub struct ConversationBuilder {
    conversation_id: String,
    messages: Vec<Message>,
    tool_calls: Vec<(ToolCall, Option<ToolResult>)>,
    last_assistant_message_id: Option<String>,
    next_id: u64,
}

impl ConversationBuilder {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            tool_calls: Vec::new(),
            last_assistant_message_id: None,
            next_id: 0,
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    pub fn user_turn(mut self, content: impl Into<String>) -> Self {
        let uuid = self.next_id("m");
        self.messages.push(Message::new(uuid, self.conversation_id.clone(), Role::User, content, None, Utc::now()));
        self
    }

    pub fn assistant_turn(mut self, content: impl Into<String>) -> Self {
        self.assistant_turn_with_reasoning(content, None)
    }

    pub fn assistant_turn_with_reasoning(mut self, content: impl Into<String>, reasoning: Option<&str>) -> Self {
        let uuid = self.next_id("m");
        self.last_assistant_message_id = Some(uuid.clone());
        self.messages.push(Message::new(
            uuid,
            self.conversation_id.clone(),
            Role::Assistant,
            content,
            reasoning.map(String::from),
            Utc::now(),
        ));
        self
    }

    /// Attaches a tool call (and its result) to the most recently added
    /// assistant turn, mirroring how a real agent's tool round is recorded
    /// against the message that triggered it.
    pub fn tool_call(mut self, tool_name: impl Into<String>, arguments: impl Into<String>, result: impl Into<String>) -> Self {
        let message_id = self.last_assistant_message_id.clone().expect("tool_call must follow an assistant_turn");
        let call_uuid = self.next_id("tc");
        let result_uuid = self.next_id("tr");
        let call = ToolCall {
            uuid: call_uuid.clone(),
            message_id,
            tool_name: tool_name.into(),
            arguments: arguments.into(),
            timestamp: Utc::now(),
            duration_ms: Some(1),
            success: true,
            iteration: Some(1),
        };
        let result = ToolResult {
            uuid: result_uuid,
            tool_call_id: call_uuid,
            success: true,
            result: result.into(),
            error: None,
            timestamp: Utc::now(),
            result_size_bytes: 0,
        };
        self.tool_calls.push((call, Some(result)));
        self
    }

    /// Writes every turn into `store`, in order.
    pub async fn seed(self, store: &FakeGraphStore) -> hcme_providers::Result<()> {
        let conversation = Conversation::new(self.conversation_id.clone(), "test conversation", Utc::now());
        store.create_conversation(&conversation).await?;

        let calls_by_message: std::collections::HashMap<String, Vec<ToolCall>> =
            self.tool_calls.iter().fold(std::collections::HashMap::new(), |mut map, (call, _)| {
                map.entry(call.message_id.clone()).or_default().push(call.clone());
                map
            });

        for message in &self.messages {
            let calls = calls_by_message.get(&message.uuid).cloned().unwrap_or_default();
            store.store_message(message, &calls).await?;
        }

        for (call, result) in &self.tool_calls {
            if let Some(result) = result {
                store.seed_tool_result(&call.uuid, result.clone());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_turns_and_tool_calls_into_store() {
        let store = FakeGraphStore::new();
        ConversationBuilder::new("c1")
            .user_turn("what does this function do?")
            .assistant_turn("let me check")
            .tool_call("grep_files", "{\"pattern\":\"fn foo\"}", "src/lib.rs:1:fn foo() {}")
            .assistant_turn("it defines foo")
            .seed(&store)
            .await
            .unwrap();

        let messages = store.get_messages("c1", None, true).await.unwrap();
        assert_eq!(messages.len(), 3);

        let tool_calls = store.get_tool_calls("c1").await.unwrap();
        assert_eq!(tool_calls.len(), 1);
        assert!(tool_calls[0].1.is_some());
    }
}
