// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

use super::*;
use fs2::FileExt;
use lodestar_core::{Project, TaskId};
use tempfile::tempdir;

fn test_store(dir: &std::path::Path) -> SpecStore {
    let anchor = dir.join(".lodestar");
    let paths = PathResolver::at_anchor(anchor);
    init_spec_file(&paths).unwrap();
    SpecStore::new(paths, Duration::from_millis(200))
}

#[test]
fn init_then_load_yields_default_project_and_no_tasks() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let doc = store.load().unwrap();
    assert_eq!(doc.project, Project::default());
    assert!(doc.tasks.is_empty());
}

#[test]
fn upsert_then_get_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let task = Task::new(TaskId::parse("tsk-1").unwrap(), "Do it", chrono::Utc::now());
    store.upsert_task(task.clone()).unwrap();
    let fetched = store.get_task("tsk-1").unwrap().unwrap();
    assert_eq!(fetched.title, "Do it");
}

#[test]
fn upsert_rejects_a_dependency_on_a_task_that_does_not_exist() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let mut t1 = Task::new(TaskId::parse("tsk-1").unwrap(), "T1", chrono::Utc::now());
    t1.depends_on = vec![TaskId::parse("tsk-2").unwrap()];
    let err = store.upsert_task(t1).unwrap_err();
    assert!(matches!(err, LodestarError::SpecInvariantViolation(SpecInvariant::MissingDep { .. })));
}

#[test]
fn upsert_rejects_a_cycle() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let mut t1 = Task::new(TaskId::parse("tsk-1").unwrap(), "T1", chrono::Utc::now());
    let t2 = Task::new(TaskId::parse("tsk-2").unwrap(), "T2", chrono::Utc::now());
    store.upsert_task(t2).unwrap();
    t1.depends_on = vec![TaskId::parse("tsk-2").unwrap()];
    store.upsert_task(t1.clone()).unwrap();
    // Now introduce a cycle: tsk-2 depends on tsk-1.
    let mut t2_cyclic = store.get_task("tsk-2").unwrap().unwrap();
    t2_cyclic.depends_on = vec![TaskId::parse("tsk-1").unwrap()];
    let err = store.upsert_task(t2_cyclic).unwrap_err();
    assert!(matches!(err, LodestarError::SpecInvariantViolation(SpecInvariant::Cycle(_))));
}

#[test]
fn soft_delete_rejects_when_live_dependents_exist_without_cascade() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let t1 = Task::new(TaskId::parse("tsk-1").unwrap(), "T1", chrono::Utc::now());
    let mut t2 = Task::new(TaskId::parse("tsk-2").unwrap(), "T2", chrono::Utc::now());
    t2.depends_on = vec![TaskId::parse("tsk-1").unwrap()];
    store.upsert_task(t1).unwrap();
    store.upsert_task(t2).unwrap();

    let err = store.soft_delete_task("tsk-1", false).unwrap_err();
    assert!(matches!(err, LodestarError::InvalidInput { .. }));
}

#[test]
fn soft_delete_cascades_to_transitive_dependents_when_requested() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let t1 = Task::new(TaskId::parse("tsk-1").unwrap(), "T1", chrono::Utc::now());
    let mut t2 = Task::new(TaskId::parse("tsk-2").unwrap(), "T2", chrono::Utc::now());
    t2.depends_on = vec![TaskId::parse("tsk-1").unwrap()];
    store.upsert_task(t1).unwrap();
    store.upsert_task(t2).unwrap();

    let doc = store.soft_delete_task("tsk-1", true).unwrap();
    assert_eq!(doc.tasks.get("tsk-1").unwrap().status, TaskStatus::Deleted);
    assert_eq!(doc.tasks.get("tsk-2").unwrap().status, TaskStatus::Deleted);
}

#[test]
fn soft_delete_missing_task_is_not_found() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let err = store.soft_delete_task("tsk-ghost", false).unwrap_err();
    assert!(matches!(err, LodestarError::TaskNotFound(_)));
}

#[test]
fn set_status_updates_and_persists() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let t1 = Task::new(TaskId::parse("tsk-1").unwrap(), "T1", chrono::Utc::now());
    store.upsert_task(t1).unwrap();
    store.set_status("tsk-1", TaskStatus::Done).unwrap();
    assert_eq!(store.get_task("tsk-1").unwrap().unwrap().status, TaskStatus::Done);
}

#[test]
fn save_times_out_if_another_holder_keeps_the_lock() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());

    let lock_path = store.path_resolver().lock_path();
    let held = std::fs::OpenOptions::new().create(true).write(true).open(&lock_path).unwrap();
    held.lock_exclusive().unwrap();

    let doc = store.load().unwrap();
    let err = store.save(&doc).unwrap_err();
    assert!(matches!(err, LodestarError::LockTimeout { .. }));

    held.unlock().unwrap();
}

#[test]
fn round_trip_is_stable_across_reload() {
    let dir = tempdir().unwrap();
    let store = test_store(dir.path());
    let t1 = Task::new(TaskId::parse("tsk-1").unwrap(), "T1", chrono::Utc::now());
    store.upsert_task(t1).unwrap();
    let loaded_once = store.load().unwrap();
    let loaded_twice = store.load().unwrap();
    assert_eq!(loaded_once, loaded_twice);
}
