// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The `Message` entity. Messages are addressed either to an agent or to a
//! task thread; task recipients are intentionally not validated against the
//! spec, since a thread may outlive or precede the task it names (§4.J, §9
//! "message threads to non-existent tasks").

use crate::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic message identifier assigned by the runtime store's
/// `AUTOINCREMENT` primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The body length limit enforced by `message.send` (§3.2).
pub const MESSAGE_BODY_MAX_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Agent,
    Task,
}

crate::simple_display! {
    RecipientType {
        Agent => "agent",
        Task => "task",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub created_at: DateTime<Utc>,
    pub from_agent_id: AgentId,
    pub to_type: RecipientType,
    pub to_id: String,
    pub body: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Mark the message read, returning `true` if this call is the one that
    /// transitioned it (idempotent: acking an already-read message is a
    /// no-op per §4.J `ack`).
    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(now);
        true
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
