// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lodestar-spec: the committed task spec plane — the YAML document model,
//! the file-locked spec store, the DAG analyzer, and the PRD context
//! resolver.

pub mod dag;
pub mod document;
pub mod prd;
pub mod store;

pub use dag::{
    dependents_of, dependents_to_recheck, detect_cycles, is_claimable, missing_deps,
    topological_order, transitive_dependents, MissingDep,
};
pub use document::SpecDocument;
pub use prd::{deliver, drift, extract_sections, hash, DeliveredContext, DriftReport, LiveSection};
pub use store::{init_spec_file, SpecStore};
