use super::*;
use lodestar_core::FakeClock;
use tempfile::TempDir;

fn fresh_coordinator() -> (TempDir, Coordinator<FakeClock>) {
    let dir = TempDir::new().unwrap();
    let anchor = dir.path().join(".lodestar");
    init(&anchor);
    let paths = PathResolver::at_anchor(anchor);
    let clock = FakeClock::new();
    let coordinator = Coordinator::with_clock(paths, EngineConfig::default(), clock).unwrap();
    (dir, coordinator)
}

fn join(coordinator: &Coordinator<FakeClock>, role: &str) -> Agent {
    coordinator
        .agent_join(AgentJoinRequest { display_name: None, role: Some(role.to_string()), capabilities: Vec::new() })
        .data
        .unwrap()
}

fn create_task(coordinator: &Coordinator<FakeClock>, id: &str, depends_on: Vec<String>) -> Task {
    create_task_with_locks(coordinator, id, depends_on, Vec::new())
}

fn create_task_with_locks(coordinator: &Coordinator<FakeClock>, id: &str, depends_on: Vec<String>, locks: Vec<String>) -> Task {
    coordinator
        .task_create(TaskCreateRequest {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            acceptance_criteria: String::new(),
            priority: None,
            labels: Vec::new(),
            depends_on,
            locks,
        })
        .data
        .unwrap()
}

#[test]
fn init_creates_an_anchor_with_an_empty_spec() {
    let (dir, coordinator) = fresh_coordinator();
    let status = coordinator.repo_status();
    assert!(status.ok);
    assert_eq!(status.data.task_counts.ready, 0);
    drop(dir);
}

#[test]
fn agent_join_then_list_returns_the_new_agent() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    let listed = coordinator.agent_list();
    assert_eq!(listed.data.len(), 1);
    assert_eq!(listed.data[0].agent_id, agent.agent_id);
}

#[test]
fn agent_heartbeat_updates_last_seen_at() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    coordinator.clock.advance(std::time::Duration::from_secs(30));
    let updated = coordinator
        .agent_heartbeat(AgentHeartbeatRequest { agent_id: agent.agent_id.to_string() })
        .data
        .unwrap();
    assert!(updated.last_seen_at > agent.last_seen_at);
}

#[test]
fn agent_leave_orphans_its_active_lease() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let leave = coordinator.agent_leave(AgentLeaveRequest { agent_id: agent.agent_id.to_string() });
    assert!(leave.ok);
    let next = coordinator.task_next(TaskNextRequest { limit: 10, agent_id: None });
    assert_eq!(next.data.len(), 1, "lease should have been orphaned, freeing the task");
}

#[test]
fn task_create_then_get_round_trips() {
    let (_dir, coordinator) = fresh_coordinator();
    let created = create_task(&coordinator, "tsk-1", Vec::new());
    let fetched = coordinator.task_get(TaskGetRequest { task_id: "tsk-1".into() }).data.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.status, TaskStatus::Ready);
}

#[test]
fn task_create_rejects_a_duplicate_id() {
    let (_dir, coordinator) = fresh_coordinator();
    create_task(&coordinator, "tsk-1", Vec::new());
    let second = coordinator.task_create(TaskCreateRequest {
        id: "tsk-1".into(),
        title: "dup".into(),
        description: String::new(),
        acceptance_criteria: String::new(),
        priority: None,
        labels: Vec::new(),
        depends_on: Vec::new(),
        locks: Vec::new(),
    });
    assert!(!second.ok);
}

#[test]
fn task_next_excludes_a_claimed_task() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    let before = coordinator.task_next(TaskNextRequest { limit: 10, agent_id: None });
    assert_eq!(before.data.len(), 1);
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let after = coordinator.task_next(TaskNextRequest { limit: 10, agent_id: None });
    assert!(after.data.is_empty());
}

#[test]
fn task_claim_rejects_a_task_whose_dependency_is_not_verified() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-a", Vec::new());
    create_task(&coordinator, "tsk-b", vec!["tsk-a".into()]);
    let claim = coordinator.task_claim(TaskClaimRequest { task_id: "tsk-b".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false });
    assert!(!claim.ok);
}

#[test]
fn task_claim_force_flag_does_not_override_an_active_lease() {
    let (_dir, coordinator) = fresh_coordinator();
    let a = join(&coordinator, "worker");
    let b = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: a.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let second = coordinator.task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: b.agent_id.to_string(), ttl: None, force: true });
    assert!(!second.ok);
}

#[test]
fn task_claim_succeeds_once_the_prior_lease_has_expired() {
    let (_dir, coordinator) = fresh_coordinator();
    let a = join(&coordinator, "worker");
    let b = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: a.agent_id.to_string(), ttl: Some("60s".into()), force: false })
        .data
        .unwrap();
    coordinator.clock.advance(std::time::Duration::from_secs(61));
    let second = coordinator.task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: b.agent_id.to_string(), ttl: None, force: false });
    assert!(second.ok);
}

#[test]
fn task_claim_warns_on_overlapping_locks_but_still_succeeds() {
    let (_dir, coordinator) = fresh_coordinator();
    let holder = join(&coordinator, "worker");
    let claimant = join(&coordinator, "worker");
    create_task_with_locks(&coordinator, "tsk-a", Vec::new(), vec!["src/foo/**".into()]);
    create_task_with_locks(&coordinator, "tsk-b", Vec::new(), vec!["src/foo/bar.rs".into()]);
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-a".into(), agent_id: holder.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let claim = coordinator.task_claim(TaskClaimRequest { task_id: "tsk-b".into(), agent_id: claimant.agent_id.to_string(), ttl: None, force: false });
    assert!(claim.ok);
    assert_eq!(claim.warnings.len(), 1);
    assert!(claim.warnings[0].contains("tsk-a"));
}

#[test]
fn task_claim_without_locks_emits_no_warnings() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    let claim = coordinator.task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false });
    assert!(claim.warnings.is_empty());
}

#[test]
fn task_renew_extends_the_expiry() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    let claimed = coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: Some("60s".into()), force: false })
        .data
        .unwrap();
    coordinator.clock.advance(std::time::Duration::from_secs(30));
    let renewed = coordinator
        .task_renew(TaskRenewRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: Some("60s".into()) })
        .data
        .unwrap();
    assert!(renewed.expires_at > claimed.expires_at);
}

#[test]
fn task_done_requires_the_lease_holder() {
    let (_dir, coordinator) = fresh_coordinator();
    let holder = join(&coordinator, "worker");
    let impostor = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: holder.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let done = coordinator.task_done(TaskDoneRequest { task_id: "tsk-1".into(), agent_id: impostor.agent_id.to_string() });
    assert!(!done.ok);
}

#[test]
fn task_verify_computes_newly_ready_dependents() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-a", Vec::new());
    create_task(&coordinator, "tsk-b", vec!["tsk-a".into()]);
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-a".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    coordinator.task_done(TaskDoneRequest { task_id: "tsk-a".into(), agent_id: agent.agent_id.to_string() }).data.task.unwrap();
    let verify = coordinator.task_verify(TaskVerifyRequest { task_id: "tsk-a".into(), agent_id: agent.agent_id.to_string() });
    assert!(verify.ok);
    assert_eq!(verify.data.newly_ready_task_ids, vec!["tsk-b".to_string()]);
}

#[test]
fn task_complete_atomically_moves_ready_to_verified() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let complete = coordinator.task_complete(TaskCompleteRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string() });
    assert!(complete.ok);
    let task = complete.data.task.unwrap();
    assert_eq!(task.status, TaskStatus::Verified);
}

#[test]
fn task_delete_cascades_to_live_dependents() {
    let (_dir, coordinator) = fresh_coordinator();
    create_task(&coordinator, "tsk-a", Vec::new());
    create_task(&coordinator, "tsk-b", vec!["tsk-a".into()]);
    let result = coordinator.task_delete(TaskDeleteRequest { task_id: "tsk-a".into(), cascade: true });
    assert!(result.ok);
    let mut deleted = result.data.deleted;
    deleted.sort();
    assert_eq!(deleted, vec!["tsk-a".to_string(), "tsk-b".to_string()]);
}

#[test]
fn task_delete_without_cascade_rejects_live_dependents() {
    let (_dir, coordinator) = fresh_coordinator();
    create_task(&coordinator, "tsk-a", Vec::new());
    create_task(&coordinator, "tsk-b", vec!["tsk-a".into()]);
    let result = coordinator.task_delete(TaskDeleteRequest { task_id: "tsk-a".into(), cascade: false });
    assert!(!result.ok);
}

#[test]
fn task_delete_clears_the_active_lease_regardless_of_holder() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let deleted = coordinator.task_delete(TaskDeleteRequest { task_id: "tsk-1".into(), cascade: false });
    assert!(deleted.ok);
    let release = coordinator.task_release(TaskReleaseRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), reason: None });
    assert!(!release.ok, "the lease should already be expired by the delete");
}

#[test]
fn message_send_then_list_marks_messages_read() {
    let (_dir, coordinator) = fresh_coordinator();
    let sender = join(&coordinator, "worker");
    let recipient = join(&coordinator, "worker");
    coordinator
        .message_send(MessageSendRequest {
            from_agent_id: sender.agent_id.to_string(),
            to_type: RecipientType::Agent,
            to_id: recipient.agent_id.to_string(),
            body: "hello".into(),
            subject: None,
            severity: None,
            task_id: None,
        })
        .data;
    let first = coordinator.message_list(MessageListRequest {
        recipient_agent_id: recipient.agent_id.to_string(),
        unread_only: true,
        mark_read: true,
        ..Default::default()
    });
    assert_eq!(first.data.len(), 1);
    let second = coordinator.message_list(MessageListRequest {
        recipient_agent_id: recipient.agent_id.to_string(),
        unread_only: true,
        ..Default::default()
    });
    assert!(second.data.is_empty());
}

#[test]
fn message_thread_returns_oldest_first() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    for body in ["first", "second"] {
        coordinator.message_send(MessageSendRequest {
            from_agent_id: agent.agent_id.to_string(),
            to_type: RecipientType::Task,
            to_id: "tsk-1".into(),
            body: body.into(),
            subject: None,
            severity: None,
            task_id: Some("tsk-1".into()),
        });
    }
    let thread = coordinator.message_thread(MessageThreadRequest { task_id: "tsk-1".into(), since: None, limit: 10 });
    assert_eq!(thread.data.iter().map(|m| m.body.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);
}

#[test]
fn message_ack_is_idempotent() {
    let (_dir, coordinator) = fresh_coordinator();
    let sender = join(&coordinator, "worker");
    let recipient = join(&coordinator, "worker");
    let sent = coordinator.message_send(MessageSendRequest {
        from_agent_id: sender.agent_id.to_string(),
        to_type: RecipientType::Agent,
        to_id: recipient.agent_id.to_string(),
        body: "hello".into(),
        subject: None,
        severity: None,
        task_id: None,
    });
    let message_id = sent.data.message_id;
    let first = coordinator.message_ack(MessageAckRequest { agent_id: recipient.agent_id.to_string(), message_id });
    let second = coordinator.message_ack(MessageAckRequest { agent_id: recipient.agent_id.to_string(), message_id });
    assert!(first.data);
    assert!(!second.data);
}

#[test]
fn message_search_requires_at_least_one_predicate() {
    let (_dir, coordinator) = fresh_coordinator();
    let result = coordinator.message_search(MessageSearchRequest::default());
    assert!(!result.ok);
}

#[test]
fn events_pull_returns_monotonic_ids() {
    let (_dir, coordinator) = fresh_coordinator();
    let agent = join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    coordinator
        .task_claim(TaskClaimRequest { task_id: "tsk-1".into(), agent_id: agent.agent_id.to_string(), ttl: None, force: false })
        .data
        .unwrap();
    let pulled = coordinator.events_pull(EventsPullRequest { since: 0, limit: 100, types: None });
    assert!(pulled.data.events.len() >= 2, "expected at least agent.joined and task.claimed");
    let ids: Vec<_> = pulled.data.events.iter().map(|e| e.id.0).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn events_pull_filters_by_type() {
    let (_dir, coordinator) = fresh_coordinator();
    join(&coordinator, "worker");
    let pulled = coordinator.events_pull(EventsPullRequest { since: 0, limit: 100, types: Some(vec!["agent.joined".into()]) });
    assert_eq!(pulled.data.events.len(), 1);
}

#[test]
fn export_snapshot_includes_tasks_and_agents() {
    let (_dir, coordinator) = fresh_coordinator();
    join(&coordinator, "worker");
    create_task(&coordinator, "tsk-1", Vec::new());
    let snapshot = coordinator.export_snapshot();
    assert_eq!(snapshot.data.tasks.len(), 1);
    assert_eq!(snapshot.data.agents.len(), 1);
}

#[test]
fn task_graph_reports_a_topological_order() {
    let (_dir, coordinator) = fresh_coordinator();
    create_task(&coordinator, "tsk-a", Vec::new());
    create_task(&coordinator, "tsk-b", vec!["tsk-a".into()]);
    let graph = coordinator.task_graph();
    let order = graph.data.topological_order.unwrap();
    let a_pos = order.iter().position(|id| id == "tsk-a").unwrap();
    let b_pos = order.iter().position(|id| id == "tsk-b").unwrap();
    assert!(a_pos < b_pos);
}
