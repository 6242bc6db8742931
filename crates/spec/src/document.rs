// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The in-memory shape of `.lodestar/spec.yaml`: a project header and an
//! insertion-ordered map of tasks. Insertion order is load-bearing — the
//! DAG analyzer's cycle detection walks tasks in this order to stay
//! deterministic (§4.D).

use indexmap::IndexMap;
use lodestar_core::{Project, Task, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecDocument {
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub tasks: IndexMap<TaskId, Task>,
}

impl SpecDocument {
    pub fn new(project: Project) -> Self {
        Self { project, tasks: IndexMap::new() }
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn upsert_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// True if `id` names a task and that task is not `deleted`.
    pub fn has_live_task(&self, id: &str) -> bool {
        self.tasks.get(id).is_some_and(|t| t.status != lodestar_core::TaskStatus::Deleted)
    }
}

impl Default for SpecDocument {
    fn default() -> Self {
        Self::new(Project::default())
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
