// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The uniform response envelope every coordinator operation returns
//! (§4.L): `{ ok, data, next, warnings, error? }`.

use lodestar_core::LodestarError;
use serde::{Deserialize, Serialize};

/// A suggested follow-up command, surfaced so a CLI or agent can chain
/// operations without re-deriving what's possible from the payload alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub intent: String,
    pub cmd: String,
}

impl NextAction {
    pub fn new(intent: impl Into<String>, cmd: impl Into<String>) -> Self {
        NextAction { intent: intent.into(), cmd: cmd.into() }
    }
}

/// The closed error-code set from §7, mirroring [`LodestarError::code`]
/// one-for-one so the wire spelling never drifts from the engine's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotInitialized,
    SpecMalformed,
    SpecInvariantViolation,
    LockTimeout,
    RuntimeBusy,
    RuntimeCorrupt,
    TaskNotFound,
    TaskNotClaimable,
    TaskAlreadyClaimed,
    TaskLeaseNotHeld,
    TaskStateConflict,
    AgentNotRegistered,
    AgentAlreadyExists,
    MessageTooLarge,
    MessageRecipientInvalid,
    InvalidInput,
}

impl ErrorCode {
    /// Parse the stable snake_case spelling produced by
    /// [`LodestarError::code`]. Unrecognized codes are a programming error
    /// in the caller (every code the engine emits is in this closed set).
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "not_initialized" => ErrorCode::NotInitialized,
            "spec_malformed" => ErrorCode::SpecMalformed,
            "spec_invariant_violation" => ErrorCode::SpecInvariantViolation,
            "lock_timeout" => ErrorCode::LockTimeout,
            "runtime_busy" => ErrorCode::RuntimeBusy,
            "runtime_corrupt" => ErrorCode::RuntimeCorrupt,
            "task_not_found" => ErrorCode::TaskNotFound,
            "task_not_claimable" => ErrorCode::TaskNotClaimable,
            "task_already_claimed" => ErrorCode::TaskAlreadyClaimed,
            "task_lease_not_held" => ErrorCode::TaskLeaseNotHeld,
            "task_state_conflict" => ErrorCode::TaskStateConflict,
            "agent_not_registered" => ErrorCode::AgentNotRegistered,
            "agent_already_exists" => ErrorCode::AgentAlreadyExists,
            "message_too_large" => ErrorCode::MessageTooLarge,
            "message_recipient_invalid" => ErrorCode::MessageRecipientInvalid,
            "invalid_input" => ErrorCode::InvalidInput,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&LodestarError> for ErrorInfo {
    fn from(err: &LodestarError) -> Self {
        let code = ErrorCode::from_code(err.code()).unwrap_or(ErrorCode::InvalidInput);
        ErrorInfo { code, message: err.to_string(), details: err.details() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<NextAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope { ok: true, data, next: Vec::new(), warnings: Vec::new(), error: None }
    }

    pub fn with_next(mut self, next: Vec<NextAction>) -> Self {
        self.next = next;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

impl<T: Default> Envelope<T> {
    /// Build the failure envelope for an operation. `data` is the type's
    /// zero value — the caller's payload shape is still published even on
    /// failure so clients don't need a second schema to parse errors.
    pub fn err(error: &LodestarError) -> Self {
        Envelope { ok: false, data: T::default(), next: Vec::new(), warnings: Vec::new(), error: Some(error.into()) }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
