// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The project header of the spec plane. No behavior of its own — a name
//! and a default branch, carried along with the task map.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub default_branch: String,
}

impl Project {
    pub fn new(name: impl Into<String>, default_branch: impl Into<String>) -> Self {
        Self { name: name.into(), default_branch: default_branch.into() }
    }
}

impl Default for Project {
    fn default() -> Self {
        Self { name: "untitled".to_string(), default_branch: "main".to_string() }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
