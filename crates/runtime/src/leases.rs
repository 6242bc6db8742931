// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The lease engine (§4.H): atomic claim/renew/release against the
//! `leases` table, lazy expiration (`expires_at > now`, checked at every
//! read — no background reaper), and orphan cleanup on service init.
//!
//! Claimability itself (is this task `ready` with every dependency
//! `verified`?) is spec-plane knowledge and is decided by the coordinator
//! before it calls [`claim`]; this module only owns the "is there already
//! an active lease" race.

use crate::agents::agent_exists;
use chrono::{DateTime, Utc};
use lodestar_core::{clamp_ttl, Lease, LeaseId, LodestarError};
use rusqlite::{params, Connection, OptionalExtension};

fn to_err(e: rusqlite::Error) -> LodestarError {
    LodestarError::RuntimeCorrupt { reason: e.to_string() }
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

fn row_to_lease(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lease> {
    let lease_id: String = row.get("lease_id")?;
    let task_id: String = row.get("task_id")?;
    let agent_id: String = row.get("agent_id")?;
    let created_at: String = row.get("created_at")?;
    let expires_at: String = row.get("expires_at")?;
    let task_id = lodestar_core::TaskId::parse(task_id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Lease {
        lease_id: LeaseId::from_string(lease_id),
        task_id,
        agent_id: lodestar_core::AgentId::from_string(agent_id),
        created_at: parse_time(&created_at),
        expires_at: parse_time(&expires_at),
    })
}

/// The row with the latest `expires_at` for a task, active or not —
/// used by `renew`/`release` to distinguish "no lease ever existed" from
/// "the lease you once held has since expired".
fn most_recent_lease(conn: &Connection, task_id: &str) -> Result<Option<Lease>, LodestarError> {
    conn.query_row(
        "SELECT * FROM leases WHERE task_id = ?1 ORDER BY expires_at DESC LIMIT 1",
        [task_id],
        row_to_lease,
    )
    .optional()
    .map_err(to_err)
}

pub fn active_lease_for_task(conn: &Connection, task_id: &str, now: DateTime<Utc>) -> Result<Option<Lease>, LodestarError> {
    conn.query_row(
        "SELECT * FROM leases WHERE task_id = ?1 AND expires_at > ?2 ORDER BY expires_at DESC LIMIT 1",
        params![task_id, now.to_rfc3339()],
        row_to_lease,
    )
    .optional()
    .map_err(to_err)
}

/// Every active lease held by `agent_id`, used by the scheduler's
/// personalization step and by `agent.leave`.
pub fn active_leases_for_agent(conn: &Connection, agent_id: &str, now: DateTime<Utc>) -> Result<Vec<Lease>, LodestarError> {
    let mut stmt = conn
        .prepare("SELECT * FROM leases WHERE agent_id = ?1 AND expires_at > ?2")
        .map_err(to_err)?;
    let rows = stmt.query_map(params![agent_id, now.to_rfc3339()], row_to_lease).map_err(to_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(to_err)
}

/// Every currently active lease, regardless of holder or task — used by
/// the coordinator's claim-time lock-overlap warning (§3.1).
pub fn active_leases(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Lease>, LodestarError> {
    let mut stmt = conn.prepare("SELECT * FROM leases WHERE expires_at > ?1").map_err(to_err)?;
    let rows = stmt.query_map(params![now.to_rfc3339()], row_to_lease).map_err(to_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(to_err)
}

/// Claim a task. The caller is responsible for having already confirmed
/// `is_claimable` against the spec; this only adjudicates the
/// one-active-lease-per-task race (§3.2).
pub fn claim(
    conn: &Connection,
    task_id: &str,
    agent_id: &str,
    ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<Lease, LodestarError> {
    if !agent_exists(conn, agent_id)? {
        return Err(LodestarError::AgentNotRegistered(agent_id.to_string()));
    }
    if let Some(existing) = active_lease_for_task(conn, task_id, now)? {
        return Err(LodestarError::TaskAlreadyClaimed {
            task_id: task_id.to_string(),
            holder_agent_id: existing.agent_id.to_string(),
            lease_id: existing.lease_id.to_string(),
        });
    }
    let ttl = clamp_ttl(ttl);
    let expires_at = now + ttl;
    let lease_id = LeaseId::new();
    conn.execute(
        "INSERT INTO leases (lease_id, task_id, agent_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![lease_id.as_str(), task_id, agent_id, now.to_rfc3339(), expires_at.to_rfc3339()],
    )
    .map_err(to_err)?;
    Ok(Lease {
        lease_id,
        task_id: lodestar_core::TaskId::parse(task_id)
            .map_err(|e| LodestarError::InvalidInput { field: "task_id".into(), reason: e.to_string() })?,
        agent_id: lodestar_core::AgentId::from_string(agent_id),
        created_at: now,
        expires_at,
    })
}

/// "Force-claim" is only meaningful against an about-to-expire lease and
/// behaves exactly like [`claim`] once that lease is inactive (§4.H, §9) —
/// it is not an override mechanism, so there is no separate code path.
pub fn force_claim(
    conn: &Connection,
    task_id: &str,
    agent_id: &str,
    ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<Lease, LodestarError> {
    claim(conn, task_id, agent_id, ttl, now)
}

/// Only the current lease holder may renew; an expired lease cannot be
/// renewed (it must be reclaimed instead).
pub fn renew(
    conn: &Connection,
    task_id: &str,
    agent_id: &str,
    ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<Lease, LodestarError> {
    let current = most_recent_lease(conn, task_id)?;
    let current = match current {
        Some(lease) if lease.is_active(now) && lease.agent_id.as_str() == agent_id => lease,
        Some(lease) => {
            return Err(LodestarError::TaskLeaseNotHeld { task_id: task_id.to_string(), lease_id: lease.lease_id.to_string() })
        }
        None => return Err(LodestarError::TaskLeaseNotHeld { task_id: task_id.to_string(), lease_id: "none".to_string() }),
    };
    let ttl = clamp_ttl(ttl);
    let expires_at = now + ttl;
    conn.execute(
        "UPDATE leases SET expires_at = ?1 WHERE lease_id = ?2",
        params![expires_at.to_rfc3339(), current.lease_id.as_str()],
    )
    .map_err(to_err)?;
    Ok(Lease { expires_at, ..current })
}

/// Only the current lease holder may release; sets `expires_at = now`,
/// rendering the lease inactive at read time without deleting the row.
pub fn release(conn: &Connection, task_id: &str, agent_id: &str, now: DateTime<Utc>) -> Result<(), LodestarError> {
    let current = active_lease_for_task(conn, task_id, now)?;
    let current = match current {
        Some(lease) if lease.agent_id.as_str() == agent_id => lease,
        Some(lease) => {
            return Err(LodestarError::TaskLeaseNotHeld { task_id: task_id.to_string(), lease_id: lease.lease_id.to_string() })
        }
        None => return Err(LodestarError::TaskLeaseNotHeld { task_id: task_id.to_string(), lease_id: "none".to_string() }),
    };
    conn.execute(
        "UPDATE leases SET expires_at = ?1 WHERE lease_id = ?2",
        params![now.to_rfc3339(), current.lease_id.as_str()],
    )
    .map_err(to_err)?;
    Ok(())
}

/// Expire the active lease on a task regardless of who holds it, used by
/// task deletion (§4.K): once a task is gone, its lease is irrelevant and
/// the ordinary holder-checked [`release`] would reject a caller who isn't
/// the current holder.
pub fn expire_for_task(conn: &Connection, task_id: &str, now: DateTime<Utc>) -> Result<Option<Lease>, LodestarError> {
    let current = active_lease_for_task(conn, task_id, now)?;
    if let Some(lease) = &current {
        conn.execute(
            "UPDATE leases SET expires_at = ?1 WHERE lease_id = ?2",
            params![now.to_rfc3339(), lease.lease_id.as_str()],
        )
        .map_err(to_err)?;
    }
    Ok(current)
}

/// For every active lease whose agent no longer exists, expire it. Returns
/// the leases that were orphaned so the caller can append `lease.orphaned`
/// events (§4.H).
pub fn orphan_cleanup(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Lease>, LodestarError> {
    let mut stmt = conn
        .prepare(
            "SELECT l.* FROM leases l LEFT JOIN agents a ON l.agent_id = a.agent_id
             WHERE l.expires_at > ?1 AND a.agent_id IS NULL",
        )
        .map_err(to_err)?;
    let orphans = stmt.query_map([now.to_rfc3339()], row_to_lease).map_err(to_err)?.collect::<rusqlite::Result<Vec<_>>>().map_err(to_err)?;
    for orphan in &orphans {
        conn.execute(
            "UPDATE leases SET expires_at = ?1 WHERE lease_id = ?2",
            params![now.to_rfc3339(), orphan.lease_id.as_str()],
        )
        .map_err(to_err)?;
    }
    Ok(orphans)
}

#[cfg(test)]
#[path = "leases_tests.rs"]
mod tests;
