// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The `Lease` entity. Leases are never deleted when they expire — they
//! simply stop satisfying the `expires_at > now` predicate that every
//! reader applies. There is no background reaper; see
//! [`crate::clock::Clock`] for the time source every expiration check uses.

use crate::define_id;
use crate::task::TaskId;
use chrono::{DateTime, Duration, Utc};

define_id! {
    /// Server-generated identifier for a single claim on a task.
    pub struct LeaseId("lse-");
}

/// The TTL a claim/renew may request is clamped into this range.
pub const MIN_LEASE_TTL: Duration = Duration::seconds(60);
pub const MAX_LEASE_TTL: Duration = Duration::hours(2);

/// Clamp a requested TTL into `[MIN_LEASE_TTL, MAX_LEASE_TTL]`.
pub fn clamp_ttl(requested: Duration) -> Duration {
    requested.clamp(MIN_LEASE_TTL, MAX_LEASE_TTL)
}

use crate::agent::AgentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub lease_id: LeaseId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn new(task_id: TaskId, agent_id: AgentId, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = clamp_ttl(ttl);
        Self { lease_id: LeaseId::new(), task_id, agent_id, created_at: now, expires_at: now + ttl }
    }

    /// A lease is active exactly when `expires_at > now` — the sole
    /// predicate every reader in the engine applies; there is no separate
    /// "status" field to fall out of sync with it.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Render the lease immediately inactive without deleting the row,
    /// used by both `release` and orphan cleanup.
    pub fn expire_now(&mut self, now: DateTime<Utc>) {
        self.expires_at = now;
    }

    pub fn renew(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.expires_at = now + clamp_ttl(ttl);
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
