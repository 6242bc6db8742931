// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Ambient configuration (§6.5): the environment variables every
//! coordinator entry point honors, gathered into one typed struct instead
//! of scattered `std::env::var` calls.

use crate::ttl;
use chrono::Duration;
use lodestar_core::LodestarError;
use std::time::Duration as StdDuration;

/// How long `task.claim`/`task.renew` leases live when the caller doesn't
/// supply an explicit `ttl` (§4.H default before clamping).
pub const DEFAULT_LEASE_TTL: Duration = Duration::minutes(15);

/// How long the coordinator waits for the spec lock before giving up
/// (§4.K "Suspension points").
pub const DEFAULT_LOCK_TIMEOUT: StdDuration = StdDuration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// `LODESTAR_DEFAULT_TTL` — overrides [`DEFAULT_LEASE_TTL`] when set.
    pub default_lease_ttl: Duration,
    /// `LODESTAR_NO_COLOR` — decorative output is a CLI concern, not the
    /// coordinator's, but the flag is parsed here so every adapter reads
    /// the same environment variable the same way.
    pub no_color: bool,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, LodestarError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same resolution `from_env` performs, but sourced from an injected
    /// lookup instead of the real process environment — keeps the override
    /// parsing testable without mutating global state (`std::env::set_var`
    /// requires `unsafe` since Rust 2024, which this workspace forbids).
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LodestarError> {
        let default_lease_ttl = match lookup("LODESTAR_DEFAULT_TTL") {
            Some(raw) => ttl::parse_human_duration(&raw)?,
            None => DEFAULT_LEASE_TTL,
        };
        let no_color = lookup("LODESTAR_NO_COLOR").is_some();
        Ok(Self { default_lease_ttl, no_color })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { default_lease_ttl: DEFAULT_LEASE_TTL, no_color: false }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
