// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

use super::*;
use chrono::{TimeZone, Utc};

fn epoch() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

#[test]
fn upsert_then_get_round_trips() {
    let mut doc = SpecDocument::default();
    let task = Task::new(TaskId::parse("tsk-1").unwrap(), "Do it", epoch());
    doc.upsert_task(task.clone());
    assert_eq!(doc.get_task("tsk-1"), Some(&task));
}

#[test]
fn has_live_task_false_for_deleted() {
    let mut doc = SpecDocument::default();
    let mut task = Task::new(TaskId::parse("tsk-1").unwrap(), "Do it", epoch());
    task.status = lodestar_core::TaskStatus::Deleted;
    doc.upsert_task(task);
    assert!(!doc.has_live_task("tsk-1"));
}

#[test]
fn has_live_task_false_for_unknown_id() {
    let doc = SpecDocument::default();
    assert!(!doc.has_live_task("nope"));
}

#[test]
fn tasks_preserve_insertion_order() {
    let mut doc = SpecDocument::default();
    for id in ["tsk-c", "tsk-a", "tsk-b"] {
        doc.upsert_task(Task::new(TaskId::parse(id).unwrap(), id, epoch()));
    }
    let ids: Vec<_> = doc.tasks.keys().map(|k| k.as_str()).collect();
    assert_eq!(ids, vec!["tsk-c", "tsk-a", "tsk-b"]);
}

#[test]
fn yaml_round_trip_preserves_task_map() {
    let mut doc = SpecDocument::new(Project::new("lodestar", "main"));
    doc.upsert_task(Task::new(TaskId::parse("tsk-1").unwrap(), "Do it", epoch()));
    let yaml = serde_yaml::to_string(&doc).unwrap();
    let back: SpecDocument = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(doc, back);
}
