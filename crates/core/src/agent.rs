// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The `Agent` entity. Agents live on the runtime plane: existence here is
//! authoritative for every mutation that names an `agent_id`.

use crate::define_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

define_id! {
    /// Server-generated stable identifier for a registered agent.
    pub struct AgentId("agt-");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Opaque per-session metadata supplied by the caller at `agent.join`.
    #[serde(default)]
    pub session_meta: BTreeMap<String, serde_json::Value>,
}

impl Agent {
    pub fn new(
        display_name: Option<String>,
        role: Option<String>,
        capabilities: Vec<String>,
        session_meta: BTreeMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: AgentId::new(),
            display_name,
            role,
            capabilities,
            registered_at: now,
            last_seen_at: now,
            session_meta,
        }
    }

    /// Bump `last_seen_at` in response to `agent.heartbeat`. Does not touch
    /// any lease — heartbeats and lease renewal are deliberately separate.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen_at = now;
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
