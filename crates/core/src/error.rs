// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The closed error taxonomy shared by every crate in the workspace.
//!
//! Every fallible operation in the engine returns `Result<T, LodestarError>`.
//! No crate invents its own error enum on top of this one — a new failure
//! mode is a new variant here, not a wrapped foreign error type leaking out
//! of `lodestar-runtime` or `lodestar-spec`.

use std::path::PathBuf;

/// The complete set of ways a Lodestar operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum LodestarError {
    #[error("no .lodestar directory found above {searched_from}")]
    NotInitialized { searched_from: PathBuf },

    #[error("spec file is malformed: {reason}")]
    SpecMalformed { reason: String },

    #[error("spec invariant violated: {0}")]
    SpecInvariantViolation(#[from] SpecInvariant),

    #[error("timed out waiting {waited_ms}ms for the spec lock")]
    LockTimeout { waited_ms: u64 },

    #[error("runtime store is busy: {reason}")]
    RuntimeBusy { reason: String },

    #[error("runtime store is corrupt: {reason}")]
    RuntimeCorrupt { reason: String },

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("task {task_id} is not claimable: {reason}")]
    TaskNotClaimable { task_id: String, reason: String },

    #[error("task {task_id} already has an active lease held by {holder_agent_id}")]
    TaskAlreadyClaimed { task_id: String, holder_agent_id: String, lease_id: String },

    #[error("lease {lease_id} for task {task_id} is not held by the caller")]
    TaskLeaseNotHeld { task_id: String, lease_id: String },

    #[error("task {task_id} state conflict: expected {expected}, found {found}")]
    TaskStateConflict { task_id: String, expected: String, found: String },

    #[error("agent {0} is not registered")]
    AgentNotRegistered(String),

    #[error("agent {0} is already registered")]
    AgentAlreadyExists(String),

    #[error("message body exceeds the {limit_bytes} byte limit")]
    MessageTooLarge { limit_bytes: usize },

    #[error("message recipient {recipient} is invalid: {reason}")]
    MessageRecipientInvalid { recipient: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

/// The specific ways a committed spec document can fail its own invariants.
///
/// Kept as a nested enum (rather than flattening into [`LodestarError`])
/// because the DAG analyzer reports these independently of the spec store's
/// I/O layer, and callers frequently want to match on the invariant kind
/// without also matching every other error variant.
#[derive(Debug, thiserror::Error)]
pub enum SpecInvariant {
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("task {task} depends on missing task {missing}")]
    MissingDep { task: String, missing: String },

    #[error("duplicate task id: {0}")]
    DuplicateId(String),

    #[error("task {task} has unrecognized status {status}")]
    BadStatus { task: String, status: String },
}

impl LodestarError {
    /// The stable, lowercase-with-dots error code carried in [`Envelope`]
    /// responses (`lodestar-wire`). Kept in `lodestar-core` so every crate
    /// maps errors to the same code without depending on `lodestar-wire`.
    ///
    /// [`Envelope`]: https://docs.rs/lodestar-wire (conceptually — the wire
    /// crate depends on this one, not the reverse)
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized { .. } => "not_initialized",
            Self::SpecMalformed { .. } => "spec_malformed",
            Self::SpecInvariantViolation(_) => "spec_invariant_violation",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::RuntimeBusy { .. } => "runtime_busy",
            Self::RuntimeCorrupt { .. } => "runtime_corrupt",
            Self::TaskNotFound(_) => "task_not_found",
            Self::TaskNotClaimable { .. } => "task_not_claimable",
            Self::TaskAlreadyClaimed { .. } => "task_already_claimed",
            Self::TaskLeaseNotHeld { .. } => "task_lease_not_held",
            Self::TaskStateConflict { .. } => "task_state_conflict",
            Self::AgentNotRegistered(_) => "agent_not_registered",
            Self::AgentAlreadyExists(_) => "agent_already_exists",
            Self::MessageTooLarge { .. } => "message_too_large",
            Self::MessageRecipientInvalid { .. } => "message_recipient_invalid",
            Self::InvalidInput { .. } => "invalid_input",
        }
    }

    /// Structured detail payload for the wire envelope's `error.details`
    /// field. Most variants say everything in their message; a few (like
    /// naming the holder of a contested lease, §8 Scenario 1) carry data a
    /// caller needs to act on programmatically rather than just display.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::TaskAlreadyClaimed { holder_agent_id, lease_id, .. } => {
                Some(serde_json::json!({ "holder_agent_id": holder_agent_id, "lease_id": lease_id }))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
