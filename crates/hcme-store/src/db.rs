use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use hcme_providers::{CodeUnit, GraphStore, RelationType, VectorIndex, VectorMatch};
use hcme_types::{Conversation, Message, Summary, SummaryLevel, ToolCall, ToolResult};

use crate::error::{to_provider_error, Error, Result};
use crate::records::*;
use crate::schema;

/// Reference `GraphStore` implementation backed by a single SQLite
/// connection (spec §4.1, §6). Suitable for tests and single-process
/// deployments; a production deployment may swap in a real graph database
/// behind the `GraphStore` trait without touching the engine, retrieval, or
/// context crates.
///
/// Methods are declared `async` to match the trait (every call is a
/// suspension point per spec §5), but the SQLite work itself runs
/// synchronously under a mutex — there is no async SQLite driver in the
/// teacher's dependency stack, and this store is not the concurrency-bound
/// path in practice.
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn column_for_index(index: VectorIndex) -> (&'static str, &'static str) {
        match index {
            VectorIndex::MessageEmbedding => ("messages", "embedding"),
            VectorIndex::SummaryEmbedding => ("summaries", "embedding"),
            VectorIndex::ScopeEmbeddingContent => ("scopes", "embedding"),
        }
    }

    /// Insert or replace a code unit fixture. Production ingestion of code
    /// units is out of scope (spec §1); this exists only so tests and local
    /// fixtures can populate `scopes` directly.
    pub async fn seed_code_unit(&self, unit: &CodeUnit, embedding: Option<Vec<f32>>) -> Result<()> {
        let embedding_json = embedding_to_json(&embedding)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO scopes (uuid, file, start_line, end_line, source, unit_type, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(uuid) DO UPDATE SET
                file = excluded.file,
                start_line = excluded.start_line,
                end_line = excluded.end_line,
                source = excluded.source,
                unit_type = excluded.unit_type,
                embedding = COALESCE(excluded.embedding, scopes.embedding)",
            params![
                unit.uuid,
                unit.file,
                unit.start_line,
                unit.end_line,
                unit.source,
                unit_type_to_str(unit.unit_type),
                embedding_json,
            ],
        )?;
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn create_conversation(&self, conversation: &Conversation) -> hcme_providers::Result<()> {
        self.do_create_conversation(conversation)
            .map_err(to_provider_error)
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> hcme_providers::Result<Option<Conversation>> {
        self.do_get_conversation(conversation_id)
            .map_err(to_provider_error)
    }

    async fn update_conversation(&self, conversation: &Conversation) -> hcme_providers::Result<()> {
        self.do_create_conversation(conversation)
            .map_err(to_provider_error)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> hcme_providers::Result<()> {
        self.do_delete_conversation(conversation_id)
            .map_err(to_provider_error)
    }

    async fn store_message(
        &self,
        message: &Message,
        tool_calls: &[ToolCall],
    ) -> hcme_providers::Result<()> {
        self.do_store_message(message, tool_calls)
            .map_err(to_provider_error)
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
        include_tool_calls: bool,
    ) -> hcme_providers::Result<Vec<Message>> {
        self.do_get_messages(conversation_id, limit, include_tool_calls)
            .map_err(to_provider_error)
    }

    async fn increment_counters(
        &self,
        conversation_id: &str,
        char_delta: u64,
    ) -> hcme_providers::Result<()> {
        self.do_increment_counters(conversation_id, char_delta)
            .map_err(to_provider_error)
    }

    async fn get_tool_calls(
        &self,
        conversation_id: &str,
    ) -> hcme_providers::Result<Vec<(ToolCall, Option<ToolResult>)>> {
        self.do_get_tool_calls(conversation_id)
            .map_err(to_provider_error)
    }

    async fn store_summary(&self, summary: &Summary) -> hcme_providers::Result<()> {
        self.do_store_summary(summary).map_err(to_provider_error)
    }

    async fn get_summaries(
        &self,
        conversation_id: &str,
        level: SummaryLevel,
    ) -> hcme_providers::Result<Vec<Summary>> {
        self.do_get_summaries(conversation_id, level)
            .map_err(to_provider_error)
    }

    async fn update_embedding(
        &self,
        node_id: &str,
        embedding: Vec<f32>,
    ) -> hcme_providers::Result<()> {
        self.do_update_embedding(node_id, embedding)
            .map_err(to_provider_error)
    }

    async fn merge_edges(
        &self,
        relation: RelationType,
        from: &str,
        to_many: &[String],
    ) -> hcme_providers::Result<()> {
        self.do_merge_edges(relation, from, to_many)
            .map_err(to_provider_error)
    }

    async fn vector_query(
        &self,
        conversation_id: Option<&str>,
        index: VectorIndex,
        vector: &[f32],
        top_k: usize,
        level_filter: Option<SummaryLevel>,
    ) -> hcme_providers::Result<Vec<VectorMatch>> {
        self.do_vector_query(conversation_id, index, vector, top_k, level_filter)
            .map_err(to_provider_error)
    }

    async fn all_embedded_nodes(
        &self,
        conversation_id: &str,
        index: VectorIndex,
        level_filter: Option<SummaryLevel>,
    ) -> hcme_providers::Result<Vec<(String, Vec<f32>)>> {
        self.do_all_embedded_nodes(conversation_id, index, level_filter)
            .map_err(to_provider_error)
    }

    async fn get_code_units(&self, uuids: &[String]) -> hcme_providers::Result<Vec<CodeUnit>> {
        self.do_get_code_units(uuids).map_err(to_provider_error)
    }
}

impl SqliteGraphStore {
    fn do_create_conversation(&self, conversation: &Conversation) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO conversations
                (uuid, title, tags, created_at, updated_at, message_count, total_chars, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(uuid) DO UPDATE SET
                title = ?2,
                tags = ?3,
                updated_at = ?5,
                message_count = ?6,
                total_chars = ?7,
                status = ?8
            "#,
            params![
                conversation.uuid,
                conversation.title,
                tags_to_json(&conversation.tags)?,
                conversation.created_at.to_rfc3339(),
                conversation.updated_at.to_rfc3339(),
                conversation.message_count as i64,
                conversation.total_chars as i64,
                status_to_str(conversation.status),
            ],
        )?;
        Ok(())
    }

    fn do_get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM conversations WHERE uuid = ?1",
            [conversation_id],
            conversation_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn do_delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM tool_results WHERE tool_call_id IN (
                SELECT uuid FROM tool_calls WHERE message_id IN (
                    SELECT uuid FROM messages WHERE conversation_id = ?1
                )
            )",
            [conversation_id],
        )?;
        conn.execute(
            "DELETE FROM tool_calls WHERE message_id IN (
                SELECT uuid FROM messages WHERE conversation_id = ?1
            )",
            [conversation_id],
        )?;
        conn.execute("DELETE FROM messages WHERE conversation_id = ?1", [conversation_id])?;
        conn.execute("DELETE FROM summaries WHERE conversation_id = ?1", [conversation_id])?;
        conn.execute("DELETE FROM conversations WHERE uuid = ?1", [conversation_id])?;
        Ok(())
    }

    fn do_store_message(&self, message: &Message, tool_calls: &[ToolCall]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO messages
                (uuid, conversation_id, role, content, reasoning, timestamp, char_count, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(uuid) DO UPDATE SET
                content = ?4,
                reasoning = ?5,
                char_count = ?7,
                embedding = COALESCE(?8, embedding)
            "#,
            params![
                message.uuid,
                message.conversation_id,
                role_to_str(message.role),
                message.content,
                message.reasoning,
                message.timestamp.to_rfc3339(),
                message.char_count as i64,
                embedding_to_json(&message.embedding)?,
            ],
        )?;

        for call in tool_calls {
            conn.execute(
                r#"
                INSERT INTO tool_calls
                    (uuid, message_id, tool_name, arguments, timestamp, duration_ms, success, iteration)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(uuid) DO UPDATE SET
                    duration_ms = ?6,
                    success = ?7
                "#,
                params![
                    call.uuid,
                    call.message_id,
                    call.tool_name,
                    call.arguments,
                    call.timestamp.to_rfc3339(),
                    call.duration_ms.map(|v| v as i64),
                    call.success as i64,
                    call.iteration.map(|v| v as i64),
                ],
            )?;
        }
        Ok(())
    }

    /// `include_tool_calls = false` drops messages whose only content is a
    /// tool-call carrier (empty `content`, at least one row in `tool_calls`)
    /// — callers that just want the conversational text, not agent
    /// mechanics, can skip the tool-call join this way (spec §4.3).
    fn do_get_messages(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
        include_tool_calls: bool,
    ) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let filter = if include_tool_calls {
            "WHERE conversation_id = ?1"
        } else {
            "WHERE conversation_id = ?1 AND NOT (content = '' AND EXISTS (SELECT 1 FROM tool_calls tc WHERE tc.message_id = messages.uuid))"
        };
        let query = match limit {
            Some(n) => format!(
                "SELECT * FROM (SELECT * FROM messages {filter} ORDER BY timestamp DESC LIMIT {n}) ORDER BY timestamp ASC"
            ),
            None => format!("SELECT * FROM messages {filter} ORDER BY timestamp ASC"),
        };
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map([conversation_id], message_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn do_increment_counters(&self, conversation_id: &str, char_delta: u64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            UPDATE conversations SET
                message_count = message_count + 1,
                total_chars = total_chars + ?2,
                updated_at = ?3
            WHERE uuid = ?1
            "#,
            params![conversation_id, char_delta as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn do_get_tool_calls(&self, conversation_id: &str) -> Result<Vec<(ToolCall, Option<ToolResult>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT tc.* FROM tool_calls tc
            JOIN messages m ON m.uuid = tc.message_id
            WHERE m.conversation_id = ?1
            ORDER BY tc.timestamp ASC
            "#,
        )?;
        let calls = stmt
            .query_map([conversation_id], tool_call_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::with_capacity(calls.len());
        for call in calls {
            let result = conn
                .query_row(
                    "SELECT * FROM tool_results WHERE tool_call_id = ?1",
                    [&call.uuid],
                    tool_result_from_row,
                )
                .optional()?;
            out.push((call, result));
        }
        Ok(out)
    }

    fn do_store_summary(&self, summary: &Summary) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO summaries (
                uuid, conversation_id, level, conversation_summary, actions_summary,
                start_turn_index, end_turn_index, char_range_start, char_range_end,
                summary_char_count, created_at, parent_summaries, embedding
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(uuid) DO UPDATE SET
                conversation_summary = ?4,
                actions_summary = ?5,
                summary_char_count = ?10,
                embedding = COALESCE(?13, embedding)
            "#,
            params![
                summary.uuid,
                summary.conversation_id,
                level_to_i64(summary.level),
                summary.content.conversation_summary,
                summary.content.actions_summary,
                summary.start_turn_index as i64,
                summary.end_turn_index as i64,
                summary.char_range_start as i64,
                summary.char_range_end as i64,
                summary.summary_char_count as i64,
                summary.created_at.to_rfc3339(),
                ids_to_json(&summary.parent_summaries)?,
                embedding_to_json(&summary.embedding)?,
            ],
        )?;
        Ok(())
    }

    fn do_get_summaries(&self, conversation_id: &str, level: SummaryLevel) -> Result<Vec<Summary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM summaries WHERE conversation_id = ?1 AND level = ?2 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![conversation_id, level_to_i64(level)], summary_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn do_update_embedding(&self, node_id: &str, embedding: Vec<f32>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let json = embedding_to_json(&Some(embedding))?;
        let updated = conn.execute(
            "UPDATE messages SET embedding = ?2 WHERE uuid = ?1",
            params![node_id, json],
        )?;
        if updated == 0 {
            conn.execute(
                "UPDATE summaries SET embedding = ?2 WHERE uuid = ?1",
                params![node_id, json],
            )?;
        }
        Ok(())
    }

    fn do_merge_edges(&self, relation: RelationType, from: &str, to_many: &[String]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for to in to_many {
            conn.execute(
                "INSERT OR IGNORE INTO edges (from_id, to_id, relation) VALUES (?1, ?2, ?3)",
                params![from, to, relation.as_str()],
            )?;
        }
        Ok(())
    }

    fn do_vector_query(
        &self,
        conversation_id: Option<&str>,
        index: VectorIndex,
        vector: &[f32],
        top_k: usize,
        level_filter: Option<SummaryLevel>,
    ) -> Result<Vec<VectorMatch>> {
        let (table, column) = Self::column_for_index(index);
        let conn = self.conn.lock().unwrap();
        // `scopes` has no `conversation_id` column (code units are
        // project-scoped, not conversation-scoped); only messages/summaries
        // take the scoping clause.
        let conversation_filter = conversation_id.filter(|_| table != "scopes");
        let query = if table == "summaries" {
            match (conversation_filter, level_filter) {
                (Some(_), Some(level)) => format!(
                    "SELECT uuid, {column} FROM summaries WHERE conversation_id = ?1 AND {column} IS NOT NULL AND level = {}",
                    level_to_i64(level)
                ),
                (Some(_), None) => {
                    format!("SELECT uuid, {column} FROM summaries WHERE conversation_id = ?1 AND {column} IS NOT NULL")
                }
                (None, Some(level)) => format!(
                    "SELECT uuid, {column} FROM summaries WHERE {column} IS NOT NULL AND level = {}",
                    level_to_i64(level)
                ),
                (None, None) => format!("SELECT uuid, {column} FROM summaries WHERE {column} IS NOT NULL"),
            }
        } else if conversation_filter.is_some() {
            format!("SELECT uuid, {column} FROM {table} WHERE conversation_id = ?1 AND {column} IS NOT NULL")
        } else {
            format!("SELECT uuid, {column} FROM {table} WHERE {column} IS NOT NULL")
        };

        let mut stmt = conn.prepare(&query)?;
        let mut rows = if let Some(conversation_id) = conversation_filter {
            stmt.query_map([conversation_id], |row| {
                let uuid: String = row.get(0)?;
                let raw: String = row.get(1)?;
                Ok((uuid, raw))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            stmt.query_map([], |row| {
                let uuid: String = row.get(0)?;
                let raw: String = row.get(1)?;
                Ok((uuid, raw))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut scored: Vec<VectorMatch> = rows
            .drain(..)
            .filter_map(|(uuid, raw)| {
                let embedding: Vec<f32> = serde_json::from_str(&raw).ok()?;
                Some(VectorMatch {
                    uuid,
                    score: cosine_similarity(vector, &embedding),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn do_all_embedded_nodes(
        &self,
        conversation_id: &str,
        index: VectorIndex,
        level_filter: Option<SummaryLevel>,
    ) -> Result<Vec<(String, Vec<f32>)>> {
        let (table, column) = Self::column_for_index(index);
        let conn = self.conn.lock().unwrap();
        let query = if table == "summaries" {
            if let Some(level) = level_filter {
                format!(
                    "SELECT uuid, {column} FROM summaries WHERE conversation_id = ?1 AND {column} IS NOT NULL AND level = {}",
                    level_to_i64(level)
                )
            } else {
                format!(
                    "SELECT uuid, {column} FROM summaries WHERE conversation_id = ?1 AND {column} IS NOT NULL"
                )
            }
        } else {
            format!("SELECT uuid, {column} FROM {table} WHERE conversation_id = ?1 AND {column} IS NOT NULL")
        };
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map([conversation_id], |row| {
                let uuid: String = row.get(0)?;
                let raw: String = row.get(1)?;
                Ok((uuid, raw))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(uuid, raw)| {
                let embedding: Vec<f32> = serde_json::from_str(&raw).ok()?;
                Some((uuid, embedding))
            })
            .collect())
    }

    fn do_get_code_units(&self, uuids: &[String]) -> Result<Vec<CodeUnit>> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = uuids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!("SELECT * FROM scopes WHERE uuid IN ({placeholders})");
        let mut stmt = conn.prepare(&query)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            uuids.iter().map(|u| u as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(params.as_slice(), code_unit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
