use crate::conversation::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tool call made by an assistant message.
///
/// `uuid` is derived from `(message_id, tool_name, call_index)` (spec §4.2).
/// `arguments` is the raw JSON string, not a parsed value, so character
/// accounting (`len(json(c.arguments))`) is unambiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub uuid: NodeId,
    pub message_id: NodeId,
    pub tool_name: String,
    pub arguments: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub success: bool,
    pub iteration: Option<u64>,
}

/// The result produced by a `ToolCall`. At most one per call (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub uuid: NodeId,
    pub tool_call_id: NodeId,
    pub success: bool,
    pub result: String,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub result_size_bytes: u64,
}

impl ToolCall {
    pub fn new(
        uuid: impl Into<String>,
        message_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            message_id: message_id.into(),
            tool_name: tool_name.into(),
            arguments: arguments.into(),
            timestamp,
            duration_ms: None,
            success: true,
            iteration: None,
        }
    }
}

impl ToolResult {
    pub fn new(
        uuid: impl Into<String>,
        tool_call_id: impl Into<String>,
        success: bool,
        result: impl Into<String>,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let result = result.into();
        let result_size_bytes = result.len() as u64;
        Self {
            uuid: uuid.into(),
            tool_call_id: tool_call_id.into(),
            success,
            result,
            error,
            timestamp,
            result_size_bytes,
        }
    }
}
