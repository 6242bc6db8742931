// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Request/response DTOs for the stable operation surface (§6.3). Each
//! operation's input and output shape is published and held stable within
//! a major version; the [`Envelope`](crate::Envelope) wraps every output.

use chrono::{DateTime, Utc};
use lodestar_core::{Agent, Event, RecipientType, Task};
use serde::{Deserialize, Serialize};

// --- repo.status / health.check / init ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoStatus {
    pub project_name: String,
    pub default_branch: String,
    pub task_counts: TaskCounts,
    pub active_agent_count: usize,
    pub schema_version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub ready: usize,
    pub done: usize,
    pub verified: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub spec_readable: bool,
    pub runtime_readable: bool,
    pub schema_version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitResult {
    pub anchor: String,
    pub created: bool,
}

// --- agent.* ---

#[derive(Debug, Clone, Deserialize)]
pub struct AgentJoinRequest {
    pub display_name: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentFindRequest {
    /// Matched against `role` and `capabilities` (any-of).
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentHeartbeatRequest {
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentLeaveRequest {
    pub agent_id: String,
}

// --- task.* ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListFilters {
    pub status: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskGetRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskNextRequest {
    #[serde(default = "default_next_limit")]
    pub limit: u32,
    pub agent_id: Option<String>,
}

fn default_next_limit() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNextEntry {
    pub task: Task,
    pub rationale: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskCreateRequest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub locks: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdateRequest {
    pub task_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub priority: Option<i32>,
    pub labels: Option<Vec<String>>,
    pub depends_on: Option<Vec<String>>,
    pub locks: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDeleteRequest {
    pub task_id: String,
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskDeleteResult {
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskClaimRequest {
    pub task_id: String,
    pub agent_id: String,
    /// Human duration (`"15m"`, `"1h"`); `None` uses the default TTL.
    pub ttl: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRenewRequest {
    pub task_id: String,
    pub agent_id: String,
    pub ttl: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskReleaseRequest {
    pub task_id: String,
    pub agent_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDoneRequest {
    pub task_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskVerifyRequest {
    pub task_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskCompleteRequest {
    pub task_id: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLeaseResult {
    pub task: Task,
    pub lease_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskTransitionResult {
    pub task: Option<Task>,
    /// Dependents whose `is_claimable` flipped true as a side effect.
    pub newly_ready_task_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskContextRequest {
    pub task_id: String,
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
}

fn default_char_budget() -> usize {
    4000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskGraphResult {
    pub topological_order: Option<Vec<String>>,
    pub edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskContextResult {
    /// The excerpt frozen into the spec at binding time.
    pub excerpt: String,
    /// Freshly-resolved live section text, concatenated and budget-trimmed.
    pub body: String,
    pub truncated: bool,
    pub drift_changed: bool,
    /// Refs affected by drift, populated only when `drift_changed` is true.
    pub affected_refs: Vec<String>,
}

// --- message.* ---

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSendRequest {
    pub from_agent_id: String,
    pub to_type: RecipientType,
    pub to_id: String,
    pub body: String,
    pub subject: Option<String>,
    pub severity: Option<String>,
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageSendResult {
    pub message_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageListRequest {
    pub recipient_agent_id: String,
    #[serde(default)]
    pub unread_only: bool,
    pub from_agent_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub mark_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageThreadRequest {
    pub task_id: String,
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageSearchRequest {
    pub keyword: Option<String>,
    pub from_agent_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageAckRequest {
    pub agent_id: String,
    pub message_id: i64,
}

// --- events.pull ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsPullRequest {
    #[serde(default)]
    pub since: i64,
    #[serde(default)]
    pub limit: u32,
    pub types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventsPullResult {
    pub events: Vec<Event>,
    pub next_cursor: i64,
}

// --- export.snapshot ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSnapshot {
    pub tasks: Vec<Task>,
    pub agents: Vec<Agent>,
}

#[cfg(test)]
#[path = "operations_tests.rs"]
mod tests;
