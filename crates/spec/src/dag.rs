// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! Pure functions over an in-memory [`SpecDocument`] (§4.D). Nothing here
//! touches disk or the lock — the spec store calls these after every
//! mutation, before it is allowed to serialize and rename the file.

use crate::document::SpecDocument;
use lodestar_core::{Task, TaskId, TaskStatus};

/// Returns the first dependency cycle found, visiting tasks in the
/// document's insertion order and following each task's `depends_on` in
/// list order, so the result is deterministic across runs.
pub fn detect_cycles(doc: &SpecDocument) -> Option<Vec<TaskId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        id: &TaskId,
        doc: &SpecDocument,
        marks: &mut std::collections::HashMap<TaskId, Mark>,
        stack: &mut Vec<TaskId>,
    ) -> Option<Vec<TaskId>> {
        match marks.get(id) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|t| t == id).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(id.clone());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(id.clone(), Mark::Visiting);
        stack.push(id.clone());
        if let Some(task) = doc.tasks.get(id.as_str()) {
            for dep in &task.depends_on {
                if let Some(cycle) = visit(dep, doc, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(id.clone(), Mark::Done);
        None
    }

    let mut marks = std::collections::HashMap::new();
    let mut stack = Vec::new();
    for id in doc.tasks.keys() {
        if marks.contains_key(id) {
            continue;
        }
        if let Some(cycle) = visit(id, doc, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

/// A `depends_on` entry that does not resolve, or resolves to a deleted
/// task — both are rejected the same way (§3.1: "every dep target exists
/// and is not deleted").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDep {
    pub task: TaskId,
    pub missing: TaskId,
}

pub fn missing_deps(doc: &SpecDocument) -> Vec<MissingDep> {
    let mut out = Vec::new();
    for (id, task) in &doc.tasks {
        if task.status == TaskStatus::Deleted {
            continue;
        }
        for dep in &task.depends_on {
            if !doc.has_live_task(dep.as_str()) {
                out.push(MissingDep { task: id.clone(), missing: dep.clone() });
            }
        }
    }
    out
}

/// `task.status == ready ∧ ∀d ∈ depends_on: spec[d].status == verified`.
pub fn is_claimable(task: &Task, doc: &SpecDocument) -> bool {
    task.status == TaskStatus::Ready
        && task.depends_on.iter().all(|dep| {
            doc.tasks.get(dep.as_str()).map(|t| t.status == TaskStatus::Verified).unwrap_or(false)
        })
}

/// Tasks that directly depend on `task_id` (reverse index over `depends_on`).
pub fn dependents_of(task_id: &str, doc: &SpecDocument) -> Vec<TaskId> {
    doc.tasks
        .iter()
        .filter(|(_, task)| task.depends_on.iter().any(|d| d.as_str() == task_id))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Transitive closure of [`dependents_of`], used by cascade delete.
pub fn transitive_dependents(task_id: &str, doc: &SpecDocument) -> Vec<TaskId> {
    let mut seen = std::collections::HashSet::new();
    let mut frontier = vec![task_id.to_string()];
    let mut out = Vec::new();
    while let Some(current) = frontier.pop() {
        for dep in dependents_of(&current, doc) {
            if seen.insert(dep.clone()) {
                frontier.push(dep.as_str().to_string());
                out.push(dep);
            }
        }
    }
    out
}

/// Tasks whose readiness may have just changed because `changed_task_id`
/// transitioned to `verified` — the candidate set for `newly_ready_task_ids`
/// in a `verify` response (§4.K). Readiness itself is recomputed by the
/// caller via [`is_claimable`]; this only narrows the set worth checking.
pub fn dependents_to_recheck(changed_task_id: &str, doc: &SpecDocument) -> Vec<TaskId> {
    dependents_of(changed_task_id, doc)
}

/// A topological ordering of all tasks, used for `task.graph` export.
/// Returns `None` if the graph contains a cycle (callers should validate
/// with [`detect_cycles`] first; this is a convenience for already-valid
/// documents).
pub fn topological_order(doc: &SpecDocument) -> Option<Vec<TaskId>> {
    if detect_cycles(doc).is_some() {
        return None;
    }
    let mut visited = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(doc.tasks.len());

    fn visit(
        id: &TaskId,
        doc: &SpecDocument,
        visited: &mut std::collections::HashSet<TaskId>,
        out: &mut Vec<TaskId>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        if let Some(task) = doc.tasks.get(id.as_str()) {
            for dep in &task.depends_on {
                visit(dep, doc, visited, out);
            }
        }
        out.push(id.clone());
    }

    for id in doc.tasks.keys() {
        visit(id, doc, &mut visited, &mut out);
    }
    Some(out)
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
