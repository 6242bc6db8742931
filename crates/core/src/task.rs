// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The `Task` entity and its identifier.
//!
//! Tasks live on the spec plane: committed, human-editable YAML, not the
//! runtime database. Unlike [`crate::agent::AgentId`] and
//! [`crate::lease::LeaseId`], a [`TaskId`] is chosen by the caller (usually
//! a short slug) rather than server-generated, so it validates a charset
//! and length rule instead of wrapping [`crate::id::IdBuf`]'s random-suffix
//! scheme.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a task ID, title, and a few other bounded spec fields.
pub const TASK_ID_MAX_LEN: usize = 64;
pub const TASK_TITLE_MAX_LEN: usize = 200;

/// A validated task identifier: letters, digits, and hyphens, 1–64 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

/// Why a candidate string is not a valid [`TaskId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTaskId {
    #[error("task id must not be empty")]
    Empty,
    #[error("task id exceeds {TASK_ID_MAX_LEN} bytes")]
    TooLong,
    #[error("task id {0:?} contains a character other than letters, digits, or hyphens")]
    BadChar(String),
}

impl TaskId {
    pub fn parse(candidate: impl Into<String>) -> Result<Self, InvalidTaskId> {
        let candidate = candidate.into();
        if candidate.is_empty() {
            return Err(InvalidTaskId::Empty);
        }
        if candidate.len() > TASK_ID_MAX_LEN {
            return Err(InvalidTaskId::TooLong);
        }
        if !candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(InvalidTaskId::BadChar(candidate));
        }
        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The four statuses a task may hold. `ready` is the initial state;
/// `deleted` is a soft tombstone — rows are never physically removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Ready,
    Done,
    Verified,
    Deleted,
}

crate::simple_display! {
    TaskStatus {
        Ready => "ready",
        Done => "done",
        Verified => "verified",
        Deleted => "deleted",
    }
}

/// A reference to a section of an external PRD document bound to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrdRef {
    pub anchor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<(u32, u32)>,
}

/// The optional PRD binding carried by a task: a source path, the specific
/// refs resolved into it, a frozen excerpt taken at creation time, and the
/// hash of the source used to detect drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrdBinding {
    pub source: String,
    #[serde(default)]
    pub refs: Vec<PrdRef>,
    #[serde(default)]
    pub excerpt: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: String,
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default)]
    pub locks: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "prd")]
    pub prd: Option<PrdBinding>,
    /// Unknown fields round-tripped verbatim, per the spec's bit-stable YAML
    /// contract (§6.2: "unknown fields are preserved and round-tripped").
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

fn default_priority() -> i32 {
    100
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            acceptance_criteria: String::new(),
            status: TaskStatus::Ready,
            priority: default_priority(),
            labels: Vec::new(),
            depends_on: Vec::new(),
            locks: Vec::new(),
            created_at: now,
            updated_at: now,
            prd: None,
            extra: serde_yaml::Mapping::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
