// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The append-only event log (§4.G): `append` assigns a monotonic id inside
//! the caller's transaction, `pull` serves a cursor-paginated feed clamped
//! to [`PULL_LIMIT_MAX`].

use chrono::{DateTime, Utc};
use lodestar_core::{AgentId, Event, EventId, EventType, LodestarError};
use rusqlite::{params, Connection};

/// Clamp ceiling applied to every `events.pull` call (§4.G).
pub const PULL_LIMIT_MAX: u32 = 1000;

fn to_err(e: rusqlite::Error) -> LodestarError {
    LodestarError::RuntimeCorrupt { reason: e.to_string() }
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

fn event_type_to_wire(event_type: EventType) -> &'static str {
    match event_type {
        EventType::AgentJoined => "agent.joined",
        EventType::AgentLeft => "agent.left",
        EventType::AgentHeartbeat => "agent.heartbeat",
        EventType::TaskClaimed => "task.claimed",
        EventType::TaskReleased => "task.released",
        EventType::TaskDone => "task.done",
        EventType::TaskVerified => "task.verified",
        EventType::TaskDeleted => "task.deleted",
        EventType::MessageSent => "message.sent",
        EventType::MessageRead => "message.read",
        EventType::LeaseOrphaned => "lease.orphaned",
    }
}

fn event_type_from_wire(s: &str) -> rusqlite::Result<EventType> {
    Ok(match s {
        "agent.joined" => EventType::AgentJoined,
        "agent.left" => EventType::AgentLeft,
        "agent.heartbeat" => EventType::AgentHeartbeat,
        "task.claimed" => EventType::TaskClaimed,
        "task.released" => EventType::TaskReleased,
        "task.done" => EventType::TaskDone,
        "task.verified" => EventType::TaskVerified,
        "task.deleted" => EventType::TaskDeleted,
        "message.sent" => EventType::MessageSent,
        "message.read" => EventType::MessageRead,
        "lease.orphaned" => EventType::LeaseOrphaned,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown event type {other:?}").into(),
            ))
        }
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let created_at: String = row.get("created_at")?;
    let type_str: String = row.get("type")?;
    let actor_agent_id: Option<String> = row.get("actor_agent_id")?;
    let target_agent_id: Option<String> = row.get("target_agent_id")?;
    let payload_json: String = row.get("payload_json")?;
    Ok(Event {
        id: EventId(row.get("id")?),
        created_at: parse_time(&created_at),
        event_type: event_type_from_wire(&type_str)?,
        actor_agent_id: actor_agent_id.map(AgentId::from_string),
        task_id: row.get("task_id")?,
        target_agent_id: target_agent_id.map(AgentId::from_string),
        payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null),
    })
}

/// Append one event, returning the id assigned by `AUTOINCREMENT`. Callers
/// append inside the same transaction that produced the state change so the
/// log and the mutation it describes are never observed out of step.
pub fn append(
    conn: &Connection,
    event_type: EventType,
    actor_agent_id: Option<&str>,
    task_id: Option<&str>,
    target_agent_id: Option<&str>,
    payload: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<EventId, LodestarError> {
    conn.execute(
        "INSERT INTO events (created_at, type, actor_agent_id, task_id, target_agent_id, payload_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            now.to_rfc3339(),
            event_type_to_wire(event_type),
            actor_agent_id,
            task_id,
            target_agent_id,
            serde_json::to_string(&payload).map_err(|e| LodestarError::RuntimeCorrupt { reason: e.to_string() })?,
        ],
    )
    .map_err(to_err)?;
    Ok(EventId(conn.last_insert_rowid()))
}

/// Events with `id > since`, oldest first, clamped to [`PULL_LIMIT_MAX`] and
/// optionally filtered to a set of types. Returns the page alongside the
/// cursor to pass as `since` on the next call — `since` itself when the page
/// is empty, so polling a drained log is a stable no-op (§4.G, §8 Scenario 6).
pub fn pull(
    conn: &Connection,
    since: i64,
    limit: u32,
    types: Option<&[EventType]>,
) -> Result<(Vec<Event>, i64), LodestarError> {
    let limit = limit.clamp(1, PULL_LIMIT_MAX);
    let events = if let Some(types) = types {
        if types.is_empty() {
            Vec::new()
        } else {
            let placeholders = types.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!("SELECT * FROM events WHERE id > ? AND type IN ({placeholders}) ORDER BY id ASC LIMIT ?");
            let mut stmt = conn.prepare(&sql).map_err(to_err)?;
            let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(since)];
            for t in types {
                args.push(Box::new(event_type_to_wire(*t).to_string()));
            }
            args.push(Box::new(limit));
            let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
            let rows = stmt
                .query_map(params_ref.as_slice(), row_to_event)
                .map_err(to_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(to_err)?;
            rows
        }
    } else {
        let mut stmt = conn
            .prepare("SELECT * FROM events WHERE id > ?1 ORDER BY id ASC LIMIT ?2")
            .map_err(to_err)?;
        let rows = stmt
            .query_map(params![since, limit], row_to_event)
            .map_err(to_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(to_err)?;
        rows
    };
    let next_cursor = events.last().map(|e| e.id.0).unwrap_or(since);
    Ok((events, next_cursor))
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
