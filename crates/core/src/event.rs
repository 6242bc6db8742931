// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The append-only `Event` entity consumed by the event log's pull API
//! (§4.G). Event IDs are strictly increasing and assigned inside the
//! mutating transaction that produced them.

use crate::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of event types the engine ever appends (§4.G). The wire
/// representation uses the dotted spelling from the spec (`task.claimed`,
/// not `task_claimed`) so it agrees with [`Display`](std::fmt::Display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "agent.joined")]
    AgentJoined,
    #[serde(rename = "agent.left")]
    AgentLeft,
    #[serde(rename = "agent.heartbeat")]
    AgentHeartbeat,
    #[serde(rename = "task.claimed")]
    TaskClaimed,
    #[serde(rename = "task.released")]
    TaskReleased,
    #[serde(rename = "task.done")]
    TaskDone,
    #[serde(rename = "task.verified")]
    TaskVerified,
    #[serde(rename = "task.deleted")]
    TaskDeleted,
    #[serde(rename = "message.sent")]
    MessageSent,
    #[serde(rename = "message.read")]
    MessageRead,
    #[serde(rename = "lease.orphaned")]
    LeaseOrphaned,
}

crate::simple_display! {
    EventType {
        AgentJoined => "agent.joined",
        AgentLeft => "agent.left",
        AgentHeartbeat => "agent.heartbeat",
        TaskClaimed => "task.claimed",
        TaskReleased => "task.released",
        TaskDone => "task.done",
        TaskVerified => "task.verified",
        TaskDeleted => "task.deleted",
        MessageSent => "message.sent",
        MessageRead => "message.read",
        LeaseOrphaned => "lease.orphaned",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub actor_agent_id: Option<AgentId>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub target_agent_id: Option<AgentId>,
    pub payload: serde_json::Value,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
