use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use hcme_providers::{CodeUnit, CodeUnitType};
use hcme_types::{
    Conversation, ConversationStatus, Message, Role, Summary, SummaryContent, SummaryLevel,
    ToolCall, ToolResult,
};
use rusqlite::Row;
use std::collections::BTreeSet;

pub fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

pub fn role_from_str(s: &str) -> Result<Role> {
    match s {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "system" => Ok(Role::System),
        other => Err(Error::Corrupt(format!("unrecognized role: {other}"))),
    }
}

pub fn status_to_str(status: ConversationStatus) -> &'static str {
    match status {
        ConversationStatus::Active => "active",
        ConversationStatus::Archived => "archived",
    }
}

pub fn status_from_str(s: &str) -> Result<ConversationStatus> {
    match s {
        "active" => Ok(ConversationStatus::Active),
        "archived" => Ok(ConversationStatus::Archived),
        other => Err(Error::Corrupt(format!("unrecognized status: {other}"))),
    }
}

pub fn level_to_i64(level: SummaryLevel) -> i64 {
    level.as_u8() as i64
}

pub fn level_from_i64(n: i64) -> Result<SummaryLevel> {
    match n {
        1 => Ok(SummaryLevel::L1),
        2 => Ok(SummaryLevel::L2),
        other => Err(Error::Corrupt(format!("unrecognized summary level: {other}"))),
    }
}

pub fn embedding_to_json(embedding: &Option<Vec<f32>>) -> Result<Option<String>> {
    match embedding {
        Some(vector) => Ok(Some(serde_json::to_string(vector)?)),
        None => Ok(None),
    }
}

pub fn embedding_from_json(raw: Option<String>) -> Result<Option<Vec<f32>>> {
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn tags_to_json(tags: &BTreeSet<String>) -> Result<String> {
    Ok(serde_json::to_string(tags)?)
}

pub fn tags_from_json(raw: &str) -> Result<BTreeSet<String>> {
    Ok(serde_json::from_str(raw)?)
}

pub fn ids_to_json(ids: &[String]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

pub fn ids_from_json(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| Error::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

pub fn conversation_from_row(row: &Row) -> rusqlite::Result<Conversation> {
    let tags_json: String = row.get("tags")?;
    let status_str: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Conversation {
        uuid: row.get("uuid")?,
        title: row.get("title")?,
        tags: tags_from_json(&tags_json).unwrap_or_default(),
        created_at: parse_timestamp(&created_at).unwrap_or_else(|_| Utc::now()),
        updated_at: parse_timestamp(&updated_at).unwrap_or_else(|_| Utc::now()),
        message_count: row.get::<_, i64>("message_count")? as u64,
        total_chars: row.get::<_, i64>("total_chars")? as u64,
        status: status_from_str(&status_str).unwrap_or(ConversationStatus::Active),
    })
}

pub fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    let role_str: String = row.get("role")?;
    let timestamp: String = row.get("timestamp")?;
    let embedding_json: Option<String> = row.get("embedding")?;
    Ok(Message {
        uuid: row.get("uuid")?,
        conversation_id: row.get("conversation_id")?,
        role: role_from_str(&role_str).unwrap_or(Role::User),
        content: row.get("content")?,
        reasoning: row.get("reasoning")?,
        timestamp: parse_timestamp(&timestamp).unwrap_or_else(|_| Utc::now()),
        char_count: row.get::<_, i64>("char_count")? as u64,
        embedding: embedding_from_json(embedding_json).unwrap_or(None),
    })
}

pub fn tool_call_from_row(row: &Row) -> rusqlite::Result<ToolCall> {
    let timestamp: String = row.get("timestamp")?;
    Ok(ToolCall {
        uuid: row.get("uuid")?,
        message_id: row.get("message_id")?,
        tool_name: row.get("tool_name")?,
        arguments: row.get("arguments")?,
        timestamp: parse_timestamp(&timestamp).unwrap_or_else(|_| Utc::now()),
        duration_ms: row.get::<_, Option<i64>>("duration_ms")?.map(|v| v as u64),
        success: row.get::<_, i64>("success")? != 0,
        iteration: row.get::<_, Option<i64>>("iteration")?.map(|v| v as u64),
    })
}

pub fn tool_result_from_row(row: &Row) -> rusqlite::Result<ToolResult> {
    let timestamp: String = row.get("timestamp")?;
    Ok(ToolResult {
        uuid: row.get("uuid")?,
        tool_call_id: row.get("tool_call_id")?,
        success: row.get::<_, i64>("success")? != 0,
        result: row.get("result")?,
        error: row.get("error")?,
        timestamp: parse_timestamp(&timestamp).unwrap_or_else(|_| Utc::now()),
        result_size_bytes: row.get::<_, i64>("result_size_bytes")? as u64,
    })
}

pub fn unit_type_to_str(unit_type: CodeUnitType) -> &'static str {
    match unit_type {
        CodeUnitType::MethodOrFunction => "method_or_function",
        CodeUnitType::ArrowFunction => "arrow_function",
        CodeUnitType::Class => "class",
        CodeUnitType::InterfaceOrType => "interface_or_type",
        CodeUnitType::Variable => "variable",
        CodeUnitType::Property => "property",
    }
}

pub fn unit_type_from_str(s: &str) -> Result<CodeUnitType> {
    match s {
        "method_or_function" => Ok(CodeUnitType::MethodOrFunction),
        "arrow_function" => Ok(CodeUnitType::ArrowFunction),
        "class" => Ok(CodeUnitType::Class),
        "interface_or_type" => Ok(CodeUnitType::InterfaceOrType),
        "variable" => Ok(CodeUnitType::Variable),
        "property" => Ok(CodeUnitType::Property),
        other => Err(Error::Corrupt(format!("unrecognized code unit type: {other}"))),
    }
}

pub fn code_unit_from_row(row: &Row) -> rusqlite::Result<CodeUnit> {
    let unit_type_str: String = row.get("unit_type")?;
    Ok(CodeUnit {
        uuid: row.get("uuid")?,
        file: row.get("file")?,
        start_line: row.get::<_, i64>("start_line")? as u32,
        end_line: row.get::<_, i64>("end_line")? as u32,
        source: row.get("source")?,
        unit_type: unit_type_from_str(&unit_type_str).unwrap_or(CodeUnitType::Variable),
    })
}

pub fn summary_from_row(row: &Row) -> rusqlite::Result<Summary> {
    let level: i64 = row.get("level")?;
    let created_at: String = row.get("created_at")?;
    let parents_json: String = row.get("parent_summaries")?;
    let embedding_json: Option<String> = row.get("embedding")?;
    Ok(Summary {
        uuid: row.get("uuid")?,
        conversation_id: row.get("conversation_id")?,
        level: level_from_i64(level).unwrap_or(SummaryLevel::L1),
        content: SummaryContent {
            conversation_summary: row.get("conversation_summary")?,
            actions_summary: row.get("actions_summary")?,
        },
        start_turn_index: row.get::<_, i64>("start_turn_index")? as u64,
        end_turn_index: row.get::<_, i64>("end_turn_index")? as u64,
        char_range_start: row.get::<_, i64>("char_range_start")? as u64,
        char_range_end: row.get::<_, i64>("char_range_end")? as u64,
        summary_char_count: row.get::<_, i64>("summary_char_count")? as u64,
        created_at: parse_timestamp(&created_at).unwrap_or_else(|_| Utc::now()),
        parent_summaries: ids_from_json(&parents_json).unwrap_or_default(),
        embedding: embedding_from_json(embedding_json).unwrap_or(None),
    })
}
