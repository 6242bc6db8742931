// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The scheduler (§4.I): picks the next claimable tasks for an agent,
//! breaking ties deterministically. Pure with respect to its inputs — the
//! coordinator is responsible for loading the spec and holding the
//! runtime connection it passes in.

use chrono::{DateTime, Utc};
use lodestar_core::{LodestarError, Task};
use lodestar_runtime::active_leases_for_agent;
use lodestar_spec::{is_claimable, SpecDocument};
use rusqlite::Connection;
use std::collections::HashSet;

/// One candidate returned by [`next`]: the task plus a short human-facing
/// explanation of why it was picked.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub task: Task,
    pub rationale: String,
}

/// Compute the next `limit` claimable tasks, in priority order.
///
/// 1. Load every task from `doc` and keep the ones [`is_claimable`].
/// 2. Drop tasks with an active lease (someone already holds them).
/// 3. If `agent_id` is given, also drop tasks that agent already holds an
///    active lease on elsewhere (personalization — an agent rarely wants
///    two claims queued at once).
/// 4. Sort by `(priority asc, created_at asc, id asc)` and take the first
///    `limit`.
pub fn next(
    doc: &SpecDocument,
    conn: &Connection,
    limit: u32,
    agent_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<ScheduledTask>, LodestarError> {
    let mut already_held: HashSet<String> = HashSet::new();
    if let Some(agent_id) = agent_id {
        for lease in active_leases_for_agent(conn, agent_id, now)? {
            already_held.insert(lease.task_id.to_string());
        }
    }

    let mut candidates: Vec<&Task> = Vec::new();
    for task in doc.tasks.values() {
        if !is_claimable(task, doc) {
            continue;
        }
        if already_held.contains(task.id.as_str()) {
            continue;
        }
        if lodestar_runtime::active_lease_for_task(conn, task.id.as_str(), now)?.is_some() {
            continue;
        }
        candidates.push(task);
    }

    candidates.sort_by(|a, b| {
        a.priority.cmp(&b.priority).then(a.created_at.cmp(&b.created_at)).then(a.id.cmp(&b.id))
    });

    Ok(candidates
        .into_iter()
        .take(limit as usize)
        .map(|task| {
            let rationale = format!(
                "ready with all dependencies verified, priority {} (created {})",
                task.priority,
                task.created_at.to_rfc3339()
            );
            ScheduledTask { task: task.clone(), rationale }
        })
        .collect())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
