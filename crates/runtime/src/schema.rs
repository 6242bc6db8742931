// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Schema definition and migrations for the runtime store (§4.F). A single
//! numbered schema is applied in a transaction and tracked in
//! `meta.schema_version`; opening a database whose recorded version is
//! newer than this binary understands is `RuntimeCorrupt`.

use lodestar_core::LodestarError;
use rusqlite::Connection;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS agents (
    agent_id TEXT PRIMARY KEY,
    display_name TEXT,
    role TEXT,
    capabilities_json TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL,
    session_meta_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leases (
    lease_id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_leases_task_expires ON leases(task_id, expires_at);

CREATE TABLE IF NOT EXISTS messages (
    message_id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    from_agent_id TEXT NOT NULL,
    to_type TEXT NOT NULL,
    to_id TEXT NOT NULL,
    task_id TEXT,
    subject TEXT,
    body TEXT NOT NULL,
    severity TEXT,
    read_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_to ON messages(to_type, to_id, message_id);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    type TEXT NOT NULL,
    actor_agent_id TEXT,
    task_id TEXT,
    target_agent_id TEXT,
    payload_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_id ON events(id);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

fn schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let table_exists: bool = conn
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)?;
    if !table_exists {
        return Ok(None);
    }
    conn.query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| {
        row.get::<_, String>(0)
    })
    .map(|v| v.parse::<i64>().ok())
    .or(Ok(None))
}

/// Run pending migrations, bringing a fresh or older database up to
/// [`CURRENT_SCHEMA_VERSION`]. Rejects a database from a newer binary.
pub fn run_migrations(conn: &mut Connection) -> Result<(), LodestarError> {
    let tx = conn
        .transaction()
        .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot start migration transaction: {e}") })?;

    let version = schema_version(&tx)
        .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot read schema version: {e}") })?;

    match version {
        None => {
            tx.execute_batch(SCHEMA_V1)
                .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot apply schema: {e}") })?;
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                [CURRENT_SCHEMA_VERSION.to_string()],
            )
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot record schema version: {e}") })?;
        }
        Some(v) if v == CURRENT_SCHEMA_VERSION => {}
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            return Err(LodestarError::RuntimeCorrupt {
                reason: format!("no migration path from schema version {v} to {CURRENT_SCHEMA_VERSION}"),
            });
        }
        Some(v) => {
            return Err(LodestarError::RuntimeCorrupt {
                reason: format!("database schema version {v} is newer than this binary understands ({CURRENT_SCHEMA_VERSION})"),
            });
        }
    }

    tx.commit().map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot commit migration: {e}") })?;
    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
