// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Messaging (§4.J): send, filtered list with optional mark-as-read, task
//! threads, keyword search, and single-message ack.

use crate::agents::agent_exists;
use chrono::{DateTime, Utc};
use lodestar_core::{
    AgentId, LodestarError, Message, MessageId, RecipientType, MESSAGE_BODY_MAX_BYTES,
};
use rusqlite::{params, Connection};

fn to_err(e: rusqlite::Error) -> LodestarError {
    LodestarError::RuntimeCorrupt { reason: e.to_string() }
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let to_type: String = row.get("to_type")?;
    let to_type = match to_type.as_str() {
        "agent" => RecipientType::Agent,
        _ => RecipientType::Task,
    };
    let created_at: String = row.get("created_at")?;
    let read_at: Option<String> = row.get("read_at")?;
    Ok(Message {
        message_id: MessageId(row.get("message_id")?),
        created_at: parse_time(&created_at),
        from_agent_id: AgentId::from_string(row.get::<_, String>("from_agent_id")?),
        to_type,
        to_id: row.get("to_id")?,
        body: row.get("body")?,
        subject: row.get("subject")?,
        severity: row.get("severity")?,
        task_id: row.get("task_id")?,
        read_at: read_at.map(|s| parse_time(&s)),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn send(
    conn: &Connection,
    from_agent_id: &str,
    to_type: RecipientType,
    to_id: &str,
    body: &str,
    subject: Option<&str>,
    severity: Option<&str>,
    task_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<MessageId, LodestarError> {
    if !agent_exists(conn, from_agent_id)? {
        return Err(LodestarError::AgentNotRegistered(from_agent_id.to_string()));
    }
    if body.len() > MESSAGE_BODY_MAX_BYTES {
        return Err(LodestarError::MessageTooLarge { limit_bytes: MESSAGE_BODY_MAX_BYTES });
    }
    // Task recipients are intentionally not validated: a thread may
    // reference a task created later, or one since archived (§9).
    if to_type == RecipientType::Agent && !agent_exists(conn, to_id)? {
        return Err(LodestarError::MessageRecipientInvalid {
            recipient: to_id.to_string(),
            reason: "no such agent".to_string(),
        });
    }
    conn.execute(
        "INSERT INTO messages (created_at, from_agent_id, to_type, to_id, task_id, subject, body, severity, read_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
        params![now.to_rfc3339(), from_agent_id, to_type.to_string(), to_id, task_id, subject, body, severity],
    )
    .map_err(to_err)?;
    Ok(MessageId(conn.last_insert_rowid()))
}

/// Clamp ceiling applied to every `list`/`thread`/`search` call (§4.J).
pub const LIST_LIMIT_MAX: u32 = 200;

#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub unread_only: bool,
    pub from_agent_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: u32,
    pub mark_read: bool,
}

/// Messages addressed to `recipient_agent_id`, newest first, optionally
/// marking the retrieved rows as read inside the same call.
pub fn list(conn: &Connection, recipient_agent_id: &str, filters: &ListFilters, now: DateTime<Utc>) -> Result<Vec<Message>, LodestarError> {
    let limit = filters.limit.clamp(1, LIST_LIMIT_MAX);
    let mut sql = String::from("SELECT * FROM messages WHERE to_type = 'agent' AND to_id = ?1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(recipient_agent_id.to_string())];
    if filters.unread_only {
        sql.push_str(" AND read_at IS NULL");
    }
    if let Some(from) = &filters.from_agent_id {
        sql.push_str(&format!(" AND from_agent_id = ?{}", args.len() + 1));
        args.push(Box::new(from.clone()));
    }
    if let Some(since) = filters.since {
        sql.push_str(&format!(" AND created_at >= ?{}", args.len() + 1));
        args.push(Box::new(since.to_rfc3339()));
    }
    if let Some(until) = filters.until {
        sql.push_str(&format!(" AND created_at <= ?{}", args.len() + 1));
        args.push(Box::new(until.to_rfc3339()));
    }
    sql.push_str(&format!(" ORDER BY message_id DESC LIMIT {limit}"));

    let mut stmt = conn.prepare(&sql).map_err(to_err)?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
    let messages = stmt
        .query_map(params_ref.as_slice(), row_to_message)
        .map_err(to_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(to_err)?;

    if filters.mark_read {
        for message in &messages {
            if message.read_at.is_none() {
                conn.execute(
                    "UPDATE messages SET read_at = ?1 WHERE message_id = ?2 AND read_at IS NULL",
                    params![now.to_rfc3339(), message.message_id.0],
                )
                .map_err(to_err)?;
            }
        }
    }
    Ok(messages)
}

/// Messages addressed to a task thread, oldest first.
pub fn thread(conn: &Connection, task_id: &str, since: Option<DateTime<Utc>>, limit: u32) -> Result<Vec<Message>, LodestarError> {
    let limit = limit.clamp(1, LIST_LIMIT_MAX);
    let (sql, since_str);
    let mut stmt;
    let rows = if let Some(s) = since {
        since_str = s.to_rfc3339();
        sql = "SELECT * FROM messages WHERE to_type = 'task' AND to_id = ?1 AND created_at >= ?2 ORDER BY message_id ASC LIMIT ?3";
        stmt = conn.prepare(sql).map_err(to_err)?;
        stmt.query_map(params![task_id, since_str, limit], row_to_message).map_err(to_err)?
    } else {
        sql = "SELECT * FROM messages WHERE to_type = 'task' AND to_id = ?1 ORDER BY message_id ASC LIMIT ?2";
        stmt = conn.prepare(sql).map_err(to_err)?;
        stmt.query_map(params![task_id, limit], row_to_message).map_err(to_err)?
    };
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(to_err)
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub keyword: Option<String>,
    pub from_agent_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: u32,
}

/// Case-insensitive body search. Requires at least one predicate (§4.J).
pub fn search(conn: &Connection, filters: &SearchFilters) -> Result<Vec<Message>, LodestarError> {
    if filters.keyword.is_none() && filters.from_agent_id.is_none() && filters.since.is_none() && filters.until.is_none() {
        return Err(LodestarError::InvalidInput {
            field: "search".into(),
            reason: "at least one of keyword, from, since, until is required".into(),
        });
    }
    let limit = filters.limit.clamp(1, LIST_LIMIT_MAX);
    let mut sql = String::from("SELECT * FROM messages WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(keyword) = &filters.keyword {
        // SQLite's LIKE is already case-insensitive for ASCII by default; no
        // COLLATE clause is needed (and COLLATE has no effect on LIKE itself —
        // it only changes the collating sequence used by `=`/`<`/`ORDER BY`).
        sql.push_str(&format!(" AND body LIKE ?{} ESCAPE '\\'", args.len() + 1));
        let escaped = keyword.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        args.push(Box::new(format!("%{escaped}%")));
    }
    if let Some(from) = &filters.from_agent_id {
        sql.push_str(&format!(" AND from_agent_id = ?{}", args.len() + 1));
        args.push(Box::new(from.clone()));
    }
    if let Some(since) = filters.since {
        sql.push_str(&format!(" AND created_at >= ?{}", args.len() + 1));
        args.push(Box::new(since.to_rfc3339()));
    }
    if let Some(until) = filters.until {
        sql.push_str(&format!(" AND created_at <= ?{}", args.len() + 1));
        args.push(Box::new(until.to_rfc3339()));
    }
    sql.push_str(&format!(" ORDER BY message_id DESC LIMIT {limit}"));

    let mut stmt = conn.prepare(&sql).map_err(to_err)?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
    let rows = stmt
        .query_map(params_ref.as_slice(), row_to_message)
        .map_err(to_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(to_err);
    rows
}

/// Idempotent: acking an already-read message is a no-op.
pub fn ack(conn: &Connection, agent_id: &str, message_id: i64, now: DateTime<Utc>) -> Result<bool, LodestarError> {
    let updated = conn
        .execute(
            "UPDATE messages SET read_at = ?1 WHERE message_id = ?2 AND to_type = 'agent' AND to_id = ?3 AND read_at IS NULL",
            params![now.to_rfc3339(), message_id, agent_id],
        )
        .map_err(to_err)?;
    if updated == 0 {
        let exists: bool = conn
            .query_row(
                "SELECT count(*) FROM messages WHERE message_id = ?1 AND to_type = 'agent' AND to_id = ?2",
                params![message_id, agent_id],
                |r| r.get::<_, i64>(0),
            )
            .map_err(to_err)?
            > 0;
        if !exists {
            return Err(LodestarError::InvalidInput {
                field: "message_id".into(),
                reason: format!("no message {message_id} addressed to {agent_id}"),
            });
        }
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
