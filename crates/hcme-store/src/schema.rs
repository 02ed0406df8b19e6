use rusqlite::Connection;

use crate::error::Result;

/// Schema version. Bumped whenever table shapes change; mismatched databases
/// are dropped and recreated rather than migrated, since this is a reference
/// store for tests and single-process deployments, not a production index.
pub const SCHEMA_VERSION: i32 = 2;

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != SCHEMA_VERSION {
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            uuid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            message_count INTEGER NOT NULL DEFAULT 0,
            total_chars INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active'
        );

        CREATE TABLE IF NOT EXISTS messages (
            uuid TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(uuid),
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            reasoning TEXT,
            timestamp TEXT NOT NULL,
            char_count INTEGER NOT NULL,
            embedding TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, timestamp);

        CREATE TABLE IF NOT EXISTS tool_calls (
            uuid TEXT PRIMARY KEY,
            message_id TEXT NOT NULL REFERENCES messages(uuid),
            tool_name TEXT NOT NULL,
            arguments TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            duration_ms INTEGER,
            success INTEGER NOT NULL,
            iteration INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_tool_calls_message ON tool_calls(message_id);

        CREATE TABLE IF NOT EXISTS tool_results (
            uuid TEXT PRIMARY KEY,
            tool_call_id TEXT NOT NULL REFERENCES tool_calls(uuid),
            success INTEGER NOT NULL,
            result TEXT NOT NULL,
            error TEXT,
            timestamp TEXT NOT NULL,
            result_size_bytes INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tool_results_call ON tool_results(tool_call_id);

        CREATE TABLE IF NOT EXISTS summaries (
            uuid TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(uuid),
            level INTEGER NOT NULL,
            conversation_summary TEXT NOT NULL,
            actions_summary TEXT NOT NULL,
            start_turn_index INTEGER NOT NULL,
            end_turn_index INTEGER NOT NULL,
            char_range_start INTEGER NOT NULL,
            char_range_end INTEGER NOT NULL,
            summary_char_count INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            parent_summaries TEXT NOT NULL DEFAULT '[]',
            embedding TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_summaries_conversation ON summaries(conversation_id, level);

        CREATE TABLE IF NOT EXISTS edges (
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            relation TEXT NOT NULL,
            PRIMARY KEY (from_id, to_id, relation)
        );
        CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id, relation);

        -- Code units (spec §4.9). Populated by the out-of-scope ingestion
        -- pipeline in production; the reference store only reads them, but
        -- exposes a seeding helper for fixtures/tests.
        CREATE TABLE IF NOT EXISTS scopes (
            uuid TEXT PRIMARY KEY,
            file TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            source TEXT NOT NULL,
            unit_type TEXT NOT NULL,
            embedding TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_scopes_file ON scopes(file);
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS scopes;
        DROP TABLE IF EXISTS edges;
        DROP TABLE IF EXISTS summaries;
        DROP TABLE IF EXISTS tool_results;
        DROP TABLE IF EXISTS tool_calls;
        DROP TABLE IF EXISTS messages;
        DROP TABLE IF EXISTS conversations;
        "#,
    )?;
    Ok(())
}
