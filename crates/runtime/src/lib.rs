// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lodestar-runtime: the embedded SQLite-backed local plane — agents,
//! leases, messages, and the event log. Never committed; lives under the
//! repo's `.lodestar` directory alongside, but independent of, the YAML
//! spec owned by `lodestar-spec`.

pub mod agents;
pub mod events;
pub mod leases;
pub mod messages;
pub mod schema;
pub mod store;

pub use agents::{agent_exists, get_agent, insert_agent, list_agents, remove_agent, touch_agent};
pub use events::{append, pull, PULL_LIMIT_MAX};
pub use leases::{
    active_lease_for_task, active_leases, active_leases_for_agent, claim, expire_for_task, force_claim,
    orphan_cleanup, release, renew,
};
pub use messages::{ack, list, search, send, thread, ListFilters, SearchFilters, LIST_LIMIT_MAX};
pub use schema::CURRENT_SCHEMA_VERSION;
pub use store::RuntimeStore;
