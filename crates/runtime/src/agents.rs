// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Agent CRUD against the `agents` table. Existence here is authoritative
//! for every operation that names an `agent_id` (§3.2).

use chrono::{DateTime, Utc};
use lodestar_core::{Agent, AgentId, LodestarError};
use rusqlite::{params, Connection, OptionalExtension};

fn row_to_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    let agent_id: String = row.get("agent_id")?;
    let capabilities_json: String = row.get("capabilities_json")?;
    let session_meta_json: String = row.get("session_meta_json")?;
    let registered_at: String = row.get("registered_at")?;
    let last_seen_at: String = row.get("last_seen_at")?;
    Ok(Agent {
        agent_id: AgentId::from_string(agent_id),
        display_name: row.get("display_name")?,
        role: row.get("role")?,
        capabilities: serde_json::from_str(&capabilities_json).unwrap_or_default(),
        registered_at: parse_time(&registered_at),
        last_seen_at: parse_time(&last_seen_at),
        session_meta: serde_json::from_str(&session_meta_json).unwrap_or_default(),
    })
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

fn to_err(e: rusqlite::Error) -> LodestarError {
    LodestarError::RuntimeCorrupt { reason: e.to_string() }
}

pub fn insert_agent(conn: &Connection, agent: &Agent) -> Result<(), LodestarError> {
    let existing = get_agent(conn, agent.agent_id.as_str())?;
    if existing.is_some() {
        return Err(LodestarError::AgentAlreadyExists(agent.agent_id.to_string()));
    }
    conn.execute(
        "INSERT INTO agents (agent_id, display_name, role, capabilities_json, registered_at, last_seen_at, session_meta_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            agent.agent_id.as_str(),
            agent.display_name,
            agent.role,
            serde_json::to_string(&agent.capabilities).map_err(|e| LodestarError::RuntimeCorrupt { reason: e.to_string() })?,
            agent.registered_at.to_rfc3339(),
            agent.last_seen_at.to_rfc3339(),
            serde_json::to_string(&agent.session_meta).map_err(|e| LodestarError::RuntimeCorrupt { reason: e.to_string() })?,
        ],
    )
    .map_err(to_err)?;
    Ok(())
}

pub fn get_agent(conn: &Connection, agent_id: &str) -> Result<Option<Agent>, LodestarError> {
    conn.query_row("SELECT * FROM agents WHERE agent_id = ?1", [agent_id], row_to_agent)
        .optional()
        .map_err(to_err)
}

pub fn agent_exists(conn: &Connection, agent_id: &str) -> Result<bool, LodestarError> {
    Ok(get_agent(conn, agent_id)?.is_some())
}

pub fn list_agents(conn: &Connection) -> Result<Vec<Agent>, LodestarError> {
    let mut stmt = conn.prepare("SELECT * FROM agents ORDER BY registered_at ASC").map_err(to_err)?;
    let rows = stmt.query_map([], row_to_agent).map_err(to_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(to_err)
}

/// Update `last_seen_at` in response to `agent.heartbeat`. Does **not**
/// touch any lease — see the open-question resolution in SPEC_FULL.md §9.
pub fn touch_agent(conn: &Connection, agent_id: &str, now: DateTime<Utc>) -> Result<(), LodestarError> {
    let updated = conn
        .execute("UPDATE agents SET last_seen_at = ?1 WHERE agent_id = ?2", params![now.to_rfc3339(), agent_id])
        .map_err(to_err)?;
    if updated == 0 {
        return Err(LodestarError::AgentNotRegistered(agent_id.to_string()));
    }
    Ok(())
}

pub fn remove_agent(conn: &Connection, agent_id: &str) -> Result<(), LodestarError> {
    let removed = conn.execute("DELETE FROM agents WHERE agent_id = ?1", [agent_id]).map_err(to_err)?;
    if removed == 0 {
        return Err(LodestarError::AgentNotRegistered(agent_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
