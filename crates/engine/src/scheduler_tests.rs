use super::*;
use chrono::TimeZone;
use lodestar_core::{Agent, Project, Task, TaskId};
use lodestar_runtime::RuntimeStore;

fn t(id: &str, priority: i32, created_secs: i64) -> Task {
    let now = Utc.timestamp_opt(created_secs, 0).unwrap();
    let mut task = Task::new(TaskId::parse(id).unwrap(), id, now);
    task.priority = priority;
    task
}

fn doc_with(tasks: Vec<Task>) -> SpecDocument {
    let mut doc = SpecDocument::new(Project::default());
    for task in tasks {
        doc.upsert_task(task);
    }
    doc
}

#[test]
fn returns_claimable_tasks_sorted_by_priority_then_age_then_id() {
    let doc = doc_with(vec![t("b", 50, 10), t("a", 50, 10), t("c", 10, 20)]);
    let store = RuntimeStore::open_in_memory().unwrap();
    let now = Utc::now();
    let picked = store.with_connection(|conn| next(&doc, conn, 10, None, now)).unwrap();
    let ids: Vec<_> = picked.iter().map(|s| s.task.id.to_string()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn excludes_tasks_that_are_not_claimable() {
    let mut blocked = t("blocked", 10, 0);
    blocked.depends_on = vec![TaskId::parse("missing").unwrap()];
    let doc = doc_with(vec![t("ready", 10, 0), blocked]);
    let store = RuntimeStore::open_in_memory().unwrap();
    let now = Utc::now();
    let picked = store.with_connection(|conn| next(&doc, conn, 10, None, now)).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].task.id.as_str(), "ready");
}

#[test]
fn excludes_tasks_with_an_active_lease() {
    let doc = doc_with(vec![t("a", 10, 0), t("b", 10, 1)]);
    let store = RuntimeStore::open_in_memory().unwrap();
    let now = Utc::now();
    let agent = Agent::new(None, None, vec![], Default::default(), now);
    store
        .with_connection(|conn| {
            lodestar_runtime::insert_agent(conn, &agent)?;
            lodestar_runtime::claim(conn, "a", agent.agent_id.as_str(), chrono::Duration::minutes(15), now)?;
            Ok(())
        })
        .unwrap();
    let picked = store.with_connection(|conn| next(&doc, conn, 10, None, now)).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].task.id.as_str(), "b");
}

#[test]
fn personalization_excludes_tasks_the_same_agent_already_holds() {
    let doc = doc_with(vec![t("a", 10, 0), t("b", 10, 1)]);
    let store = RuntimeStore::open_in_memory().unwrap();
    let now = Utc::now();
    let agent = Agent::new(None, None, vec![], Default::default(), now);
    store
        .with_connection(|conn| {
            lodestar_runtime::insert_agent(conn, &agent)?;
            lodestar_runtime::claim(conn, "a", agent.agent_id.as_str(), chrono::Duration::minutes(15), now)?;
            Ok(())
        })
        .unwrap();
    let picked = store
        .with_connection(|conn| next(&doc, conn, 10, Some(agent.agent_id.as_str()), now))
        .unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].task.id.as_str(), "b");
}

#[test]
fn limit_truncates_the_candidate_list() {
    let doc = doc_with(vec![t("a", 10, 0), t("b", 10, 1), t("c", 10, 2)]);
    let store = RuntimeStore::open_in_memory().unwrap();
    let now = Utc::now();
    let picked = store.with_connection(|conn| next(&doc, conn, 2, None, now)).unwrap();
    assert_eq!(picked.len(), 2);
}
