// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The coordinator (§4.K): the only component callers mutate through. Each
//! operation validates against whichever plane(s) it touches, applies the
//! change, appends the events the change implies, and returns a
//! [`lodestar_wire::Envelope`].
//!
//! Cross-plane writes (`task.claim`, `task.done`, `task.verify`,
//! `task.complete`, `task.delete`) always resolve the spec side first —
//! it is the idempotent fact — before the runtime transaction that records
//! leases and events commits (§4.K, §9 "ordering of spec lock and runtime
//! transaction").

use crate::config::{EngineConfig, DEFAULT_LOCK_TIMEOUT};
use crate::scheduler;
use crate::ttl;
use lodestar_core::{
    Agent, Clock, EventType, LodestarError, Message, PathResolver, RecipientType, SystemClock, Task,
    TaskId, TaskStatus,
};
use lodestar_runtime::{ListFilters, RuntimeStore, SearchFilters};
use lodestar_spec::{is_claimable, SpecDocument, SpecStore};
use lodestar_wire::{
    AgentFindRequest, AgentHeartbeatRequest, AgentJoinRequest, AgentLeaveRequest, Envelope,
    EventsPullRequest, EventsPullResult, ExportSnapshot, HealthCheck, InitResult, MessageAckRequest,
    MessageListRequest, MessageSearchRequest, MessageSendRequest, MessageSendResult,
    MessageThreadRequest, RepoStatus, TaskClaimRequest, TaskCompleteRequest, TaskContextRequest,
    TaskContextResult, TaskCounts, TaskCreateRequest, TaskDeleteRequest, TaskDeleteResult,
    TaskDoneRequest, TaskGetRequest, TaskGraphResult, TaskLeaseResult, TaskListFilters, TaskNextEntry,
    TaskNextRequest, TaskReleaseRequest, TaskRenewRequest, TaskTransitionResult, TaskUpdateRequest,
    TaskVerifyRequest,
};
use std::path::PathBuf;

/// Wrap a fallible result into the uniform envelope shape. `T::default()`
/// stands in for the payload on the error path so `ok`/`err` responses
/// always carry the same schema.
fn wrap<T: Default>(result: Result<T, LodestarError>) -> Envelope<T> {
    match result {
        Ok(data) => Envelope::ok(data),
        Err(e) => Envelope::err(&e),
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus, LodestarError> {
    match s {
        "ready" => Ok(TaskStatus::Ready),
        "done" => Ok(TaskStatus::Done),
        "verified" => Ok(TaskStatus::Verified),
        "deleted" => Ok(TaskStatus::Deleted),
        other => {
            Err(LodestarError::InvalidInput { field: "status".into(), reason: format!("unknown task status {other:?}") })
        }
    }
}

/// Mirrors `EventType`'s wire spelling (kept separately from
/// `lodestar-runtime`'s private copy since `events.pull`'s `types` filter
/// arrives here as caller-facing strings, not SQL column values).
fn parse_event_type(s: &str) -> Result<EventType, LodestarError> {
    Ok(match s {
        "agent.joined" => EventType::AgentJoined,
        "agent.left" => EventType::AgentLeft,
        "agent.heartbeat" => EventType::AgentHeartbeat,
        "task.claimed" => EventType::TaskClaimed,
        "task.released" => EventType::TaskReleased,
        "task.done" => EventType::TaskDone,
        "task.verified" => EventType::TaskVerified,
        "task.deleted" => EventType::TaskDeleted,
        "message.sent" => EventType::MessageSent,
        "message.read" => EventType::MessageRead,
        "lease.orphaned" => EventType::LeaseOrphaned,
        other => {
            return Err(LodestarError::InvalidInput { field: "types".into(), reason: format!("unknown event type {other:?}") })
        }
    })
}

/// Dependents of `task_id` that just became claimable, for `newly_ready_task_ids`.
fn newly_ready_ids(task_id: &str, doc: &SpecDocument) -> Vec<String> {
    lodestar_spec::dependents_to_recheck(task_id, doc)
        .into_iter()
        .filter(|id| doc.get_task(id.as_str()).is_some_and(|t| is_claimable(t, doc)))
        .map(|id| id.to_string())
        .collect()
}

pub struct Coordinator<C: Clock = SystemClock> {
    spec: SpecStore,
    runtime: RuntimeStore,
    clock: C,
    config: EngineConfig,
}

impl Coordinator<SystemClock> {
    pub fn open(paths: PathResolver, config: EngineConfig) -> Result<Self, LodestarError> {
        Self::with_clock(paths, config, SystemClock)
    }
}

impl<C: Clock> Coordinator<C> {
    /// Open the coordinator against an existing anchor, running orphan
    /// cleanup once up front — the same startup discipline the teacher's
    /// lifecycle module applies before accepting its first request.
    pub fn with_clock(paths: PathResolver, config: EngineConfig, clock: C) -> Result<Self, LodestarError> {
        let runtime = RuntimeStore::open(paths.runtime_path())?;
        let spec = SpecStore::new(paths, DEFAULT_LOCK_TIMEOUT);
        let now = clock.now_utc();
        runtime.with_transaction(|tx| {
            let orphaned = lodestar_runtime::orphan_cleanup(tx, now)?;
            for lease in &orphaned {
                lodestar_runtime::append(
                    tx,
                    EventType::LeaseOrphaned,
                    None,
                    Some(lease.task_id.as_str()),
                    Some(lease.agent_id.as_str()),
                    serde_json::json!({ "lease_id": lease.lease_id.as_str() }),
                    now,
                )?;
            }
            Ok(())
        })?;
        Ok(Self { spec, runtime, clock, config })
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now_utc()
    }

    fn resolve_prd_source(&self, source: &str) -> PathBuf {
        let path = PathBuf::from(source);
        if path.is_absolute() {
            return path;
        }
        match self.spec.path_resolver().anchor().parent() {
            Some(repo_root) => repo_root.join(path),
            None => path,
        }
    }

    // --- repo.status / health.check ---

    pub fn repo_status(&self) -> Envelope<RepoStatus> {
        wrap(self.try_repo_status())
    }

    fn try_repo_status(&self) -> Result<RepoStatus, LodestarError> {
        let doc = self.spec.load()?;
        let mut counts = TaskCounts::default();
        for task in doc.tasks.values() {
            match task.status {
                TaskStatus::Ready => counts.ready += 1,
                TaskStatus::Done => counts.done += 1,
                TaskStatus::Verified => counts.verified += 1,
                TaskStatus::Deleted => counts.deleted += 1,
            }
        }
        let active_agent_count = self.runtime.with_connection(lodestar_runtime::list_agents)?.len();
        Ok(RepoStatus {
            project_name: doc.project.name,
            default_branch: doc.project.default_branch,
            task_counts: counts,
            active_agent_count,
            schema_version: lodestar_runtime::CURRENT_SCHEMA_VERSION,
        })
    }

    pub fn health_check(&self) -> Envelope<HealthCheck> {
        let spec_readable = self.spec.load().is_ok();
        let runtime_readable = self.runtime.with_connection(|_| Ok(())).is_ok();
        Envelope::ok(HealthCheck {
            spec_readable,
            runtime_readable,
            schema_version: lodestar_runtime::CURRENT_SCHEMA_VERSION,
        })
    }

    // --- agent.* ---

    pub fn agent_join(&self, req: AgentJoinRequest) -> Envelope<Option<Agent>> {
        wrap(self.try_agent_join(&req).map(Some))
    }

    fn try_agent_join(&self, req: &AgentJoinRequest) -> Result<Agent, LodestarError> {
        let now = self.now();
        let agent = Agent::new(req.display_name.clone(), req.role.clone(), req.capabilities.clone(), Default::default(), now);
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::insert_agent(tx, &agent)?;
            lodestar_runtime::append(tx, EventType::AgentJoined, Some(agent.agent_id.as_str()), None, None, serde_json::json!({}), now)?;
            Ok(())
        })?;
        Ok(agent)
    }

    pub fn agent_list(&self) -> Envelope<Vec<Agent>> {
        wrap(self.runtime.with_connection(lodestar_runtime::list_agents))
    }

    pub fn agent_find(&self, req: AgentFindRequest) -> Envelope<Vec<Agent>> {
        wrap(self.try_agent_find(&req))
    }

    fn try_agent_find(&self, req: &AgentFindRequest) -> Result<Vec<Agent>, LodestarError> {
        let agents = self.runtime.with_connection(lodestar_runtime::list_agents)?;
        Ok(agents
            .into_iter()
            .filter(|a| req.role.as_deref().map(|r| a.role.as_deref() == Some(r)).unwrap_or(true))
            .filter(|a| req.capabilities.is_empty() || req.capabilities.iter().any(|c| a.capabilities.contains(c)))
            .collect())
    }

    pub fn agent_heartbeat(&self, req: AgentHeartbeatRequest) -> Envelope<Option<Agent>> {
        wrap(self.try_agent_heartbeat(&req).map(Some))
    }

    fn try_agent_heartbeat(&self, req: &AgentHeartbeatRequest) -> Result<Agent, LodestarError> {
        let now = self.now();
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::touch_agent(tx, &req.agent_id, now)?;
            lodestar_runtime::append(tx, EventType::AgentHeartbeat, Some(&req.agent_id), None, None, serde_json::json!({}), now)?;
            Ok(())
        })?;
        self.runtime
            .with_connection(|conn| lodestar_runtime::get_agent(conn, &req.agent_id))?
            .ok_or_else(|| LodestarError::AgentNotRegistered(req.agent_id.clone()))
    }

    pub fn agent_leave(&self, req: AgentLeaveRequest) -> Envelope<()> {
        wrap(self.try_agent_leave(&req))
    }

    fn try_agent_leave(&self, req: &AgentLeaveRequest) -> Result<(), LodestarError> {
        let now = self.now();
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::remove_agent(tx, &req.agent_id)?;
            let orphaned = lodestar_runtime::orphan_cleanup(tx, now)?;
            for lease in &orphaned {
                lodestar_runtime::append(
                    tx,
                    EventType::LeaseOrphaned,
                    None,
                    Some(lease.task_id.as_str()),
                    Some(lease.agent_id.as_str()),
                    serde_json::json!({ "lease_id": lease.lease_id.as_str() }),
                    now,
                )?;
            }
            lodestar_runtime::append(tx, EventType::AgentLeft, Some(&req.agent_id), None, None, serde_json::json!({}), now)?;
            Ok(())
        })
    }

    // --- task.* ---

    pub fn task_list(&self, filters: TaskListFilters) -> Envelope<Vec<Task>> {
        wrap(self.try_task_list(&filters))
    }

    fn try_task_list(&self, filters: &TaskListFilters) -> Result<Vec<Task>, LodestarError> {
        let doc = self.spec.load()?;
        let status = filters.status.as_deref().map(parse_task_status).transpose()?;
        Ok(doc
            .tasks
            .values()
            .filter(|t| status.map(|s| t.status == s).unwrap_or(true))
            .filter(|t| filters.label.as_deref().map(|l| t.labels.iter().any(|x| x == l)).unwrap_or(true))
            .cloned()
            .collect())
    }

    pub fn task_get(&self, req: TaskGetRequest) -> Envelope<Option<Task>> {
        wrap(self.spec.get_task(&req.task_id))
    }

    pub fn task_next(&self, req: TaskNextRequest) -> Envelope<Vec<TaskNextEntry>> {
        wrap(self.try_task_next(&req))
    }

    fn try_task_next(&self, req: &TaskNextRequest) -> Result<Vec<TaskNextEntry>, LodestarError> {
        let doc = self.spec.load()?;
        let now = self.now();
        let picked = self
            .runtime
            .with_connection(|conn| scheduler::next(&doc, conn, req.limit, req.agent_id.as_deref(), now))?;
        Ok(picked.into_iter().map(|s| TaskNextEntry { task: s.task, rationale: s.rationale }).collect())
    }

    pub fn task_create(&self, req: TaskCreateRequest) -> Envelope<Option<Task>> {
        wrap(self.try_task_create(&req).map(Some))
    }

    fn try_task_create(&self, req: &TaskCreateRequest) -> Result<Task, LodestarError> {
        let now = self.now();
        let doc = self.spec.load()?;
        if doc.tasks.contains_key(req.id.as_str()) {
            return Err(LodestarError::InvalidInput { field: "id".into(), reason: format!("task {} already exists", req.id) });
        }
        let id = TaskId::parse(req.id.clone()).map_err(|e| LodestarError::InvalidInput { field: "id".into(), reason: e.to_string() })?;
        let mut task = Task::new(id, req.title.clone(), now);
        task.description = req.description.clone();
        task.acceptance_criteria = req.acceptance_criteria.clone();
        if let Some(priority) = req.priority {
            task.priority = priority;
        }
        task.labels = req.labels.clone();
        task.locks = req.locks.clone();
        task.depends_on = req
            .depends_on
            .iter()
            .map(|d| TaskId::parse(d.clone()).map_err(|e| LodestarError::InvalidInput { field: "depends_on".into(), reason: e.to_string() }))
            .collect::<Result<Vec<_>, _>>()?;
        let updated = self.spec.upsert_task(task.clone())?;
        updated.get_task(task.id.as_str()).cloned().ok_or_else(|| LodestarError::TaskNotFound(task.id.to_string()))
    }

    pub fn task_update(&self, req: TaskUpdateRequest) -> Envelope<Option<Task>> {
        wrap(self.try_task_update(&req).map(Some))
    }

    fn try_task_update(&self, req: &TaskUpdateRequest) -> Result<Task, LodestarError> {
        let doc = self.spec.load()?;
        let mut task = doc.get_task(&req.task_id).cloned().ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        if let Some(title) = &req.title {
            task.title = title.clone();
        }
        if let Some(description) = &req.description {
            task.description = description.clone();
        }
        if let Some(ac) = &req.acceptance_criteria {
            task.acceptance_criteria = ac.clone();
        }
        if let Some(priority) = req.priority {
            task.priority = priority;
        }
        if let Some(labels) = &req.labels {
            task.labels = labels.clone();
        }
        if let Some(locks) = &req.locks {
            task.locks = locks.clone();
        }
        if let Some(depends_on) = &req.depends_on {
            task.depends_on = depends_on
                .iter()
                .map(|d| TaskId::parse(d.clone()).map_err(|e| LodestarError::InvalidInput { field: "depends_on".into(), reason: e.to_string() }))
                .collect::<Result<Vec<_>, _>>()?;
        }
        task.updated_at = self.now();
        let updated = self.spec.upsert_task(task.clone())?;
        updated.get_task(task.id.as_str()).cloned().ok_or_else(|| LodestarError::TaskNotFound(task.id.to_string()))
    }

    pub fn task_delete(&self, req: TaskDeleteRequest) -> Envelope<TaskDeleteResult> {
        wrap(self.try_task_delete(&req))
    }

    fn try_task_delete(&self, req: &TaskDeleteRequest) -> Result<TaskDeleteResult, LodestarError> {
        let now = self.now();
        let doc = self.spec.load()?;
        if !doc.has_live_task(&req.task_id) {
            return Err(LodestarError::TaskNotFound(req.task_id.clone()));
        }
        let dependents = lodestar_spec::transitive_dependents(&req.task_id, &doc);
        let mut deleted: Vec<String> = dependents.iter().filter(|d| doc.has_live_task(d.as_str())).map(|d| d.to_string()).collect();
        deleted.push(req.task_id.clone());
        self.spec.soft_delete_task(&req.task_id, req.cascade)?;
        self.runtime.with_transaction(|tx| {
            for id in &deleted {
                lodestar_runtime::expire_for_task(tx, id, now)?;
                lodestar_runtime::append(tx, EventType::TaskDeleted, None, Some(id), None, serde_json::json!({}), now)?;
            }
            Ok(())
        })?;
        Ok(TaskDeleteResult { deleted })
    }

    pub fn task_claim(&self, req: TaskClaimRequest) -> Envelope<Option<TaskLeaseResult>> {
        match self.try_task_claim(&req) {
            Ok((result, warnings)) => Envelope::ok(Some(result)).with_warnings(warnings),
            Err(e) => Envelope::err(&e),
        }
    }

    fn try_task_claim(&self, req: &TaskClaimRequest) -> Result<(TaskLeaseResult, Vec<String>), LodestarError> {
        let doc = self.spec.load()?;
        let task = doc.get_task(&req.task_id).cloned().ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        if !is_claimable(&task, &doc) {
            return Err(LodestarError::TaskNotClaimable {
                task_id: req.task_id.clone(),
                reason: "task is not ready or a dependency is not yet verified".to_string(),
            });
        }
        let ttl = self.resolve_ttl(req.ttl.as_deref())?;
        let now = self.now();
        let warnings = self.lock_overlap_warnings(&task, &doc, now)?;
        let lease = self.runtime.with_transaction(|tx| {
            let lease = if req.force {
                lodestar_runtime::force_claim(tx, &req.task_id, &req.agent_id, ttl, now)?
            } else {
                lodestar_runtime::claim(tx, &req.task_id, &req.agent_id, ttl, now)?
            };
            lodestar_runtime::append(
                tx,
                EventType::TaskClaimed,
                Some(&req.agent_id),
                Some(&req.task_id),
                None,
                serde_json::json!({ "lease_id": lease.lease_id.as_str() }),
                now,
            )?;
            Ok(lease)
        })?;
        Ok((TaskLeaseResult { task, lease_id: lease.lease_id.to_string(), expires_at: lease.expires_at }, warnings))
    }

    /// `locks` is advisory only (§3.1): a glob overlap with another task's
    /// active lease never blocks a claim, it only surfaces a warning
    /// naming the task whose lock list it collides with.
    fn lock_overlap_warnings(&self, task: &Task, doc: &SpecDocument, now: chrono::DateTime<chrono::Utc>) -> Result<Vec<String>, LodestarError> {
        if task.locks.is_empty() {
            return Ok(Vec::new());
        }
        let active = self.runtime.with_connection(|conn| lodestar_runtime::active_leases(conn, now))?;
        let mut warnings = Vec::new();
        for lease in &active {
            if lease.task_id.as_str() == task.id.as_str() {
                continue;
            }
            let Some(other) = doc.get_task(lease.task_id.as_str()) else { continue };
            if crate::locks::overlaps(&task.locks, &other.locks) {
                warnings.push(format!(
                    "locks overlap with task {} (held by {})",
                    other.id, lease.agent_id
                ));
            }
        }
        Ok(warnings)
    }

    fn resolve_ttl(&self, raw: Option<&str>) -> Result<chrono::Duration, LodestarError> {
        match raw {
            Some(raw) => ttl::parse_human_duration(raw),
            None => Ok(self.config.default_lease_ttl),
        }
    }

    pub fn task_renew(&self, req: TaskRenewRequest) -> Envelope<Option<TaskLeaseResult>> {
        wrap(self.try_task_renew(&req).map(Some))
    }

    /// Renewal has no dedicated event type in the closed set (§4.G); it is
    /// structurally a re-claim, so it reuses `task.claimed` with a
    /// `renewed: true` payload marker rather than inventing a new type.
    fn try_task_renew(&self, req: &TaskRenewRequest) -> Result<TaskLeaseResult, LodestarError> {
        let doc = self.spec.load()?;
        let task = doc.get_task(&req.task_id).cloned().ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        let ttl = self.resolve_ttl(req.ttl.as_deref())?;
        let now = self.now();
        let lease = self.runtime.with_transaction(|tx| {
            let lease = lodestar_runtime::renew(tx, &req.task_id, &req.agent_id, ttl, now)?;
            lodestar_runtime::append(
                tx,
                EventType::TaskClaimed,
                Some(&req.agent_id),
                Some(&req.task_id),
                None,
                serde_json::json!({ "lease_id": lease.lease_id.as_str(), "renewed": true }),
                now,
            )?;
            Ok(lease)
        })?;
        Ok(TaskLeaseResult { task, lease_id: lease.lease_id.to_string(), expires_at: lease.expires_at })
    }

    pub fn task_release(&self, req: TaskReleaseRequest) -> Envelope<()> {
        wrap(self.try_task_release(&req))
    }

    fn try_task_release(&self, req: &TaskReleaseRequest) -> Result<(), LodestarError> {
        let now = self.now();
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::release(tx, &req.task_id, &req.agent_id, now)?;
            lodestar_runtime::append(
                tx,
                EventType::TaskReleased,
                Some(&req.agent_id),
                Some(&req.task_id),
                None,
                serde_json::json!({ "reason": req.reason }),
                now,
            )?;
            Ok(())
        })
    }

    pub fn task_done(&self, req: TaskDoneRequest) -> Envelope<TaskTransitionResult> {
        wrap(self.try_task_done(&req))
    }

    fn try_task_done(&self, req: &TaskDoneRequest) -> Result<TaskTransitionResult, LodestarError> {
        let now = self.now();
        let doc = self.spec.load()?;
        let task = doc.get_task(&req.task_id).ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        if task.status != TaskStatus::Ready {
            return Err(LodestarError::TaskStateConflict {
                task_id: req.task_id.clone(),
                expected: TaskStatus::Ready.to_string(),
                found: task.status.to_string(),
            });
        }
        self.require_held_lease(&req.task_id, &req.agent_id, now)?;
        let updated = self.spec.set_status(&req.task_id, TaskStatus::Done)?;
        let task = updated.get_task(&req.task_id).cloned();
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::append(tx, EventType::TaskDone, Some(&req.agent_id), Some(&req.task_id), None, serde_json::json!({}), now)?;
            Ok(())
        })?;
        Ok(TaskTransitionResult { task, newly_ready_task_ids: Vec::new() })
    }

    fn require_held_lease(&self, task_id: &str, agent_id: &str, now: chrono::DateTime<chrono::Utc>) -> Result<(), LodestarError> {
        self.runtime.with_connection(|conn| {
            let lease = lodestar_runtime::active_lease_for_task(conn, task_id, now)?
                .ok_or_else(|| LodestarError::TaskLeaseNotHeld { task_id: task_id.to_string(), lease_id: "none".to_string() })?;
            if lease.agent_id.as_str() != agent_id {
                return Err(LodestarError::TaskLeaseNotHeld { task_id: task_id.to_string(), lease_id: lease.lease_id.to_string() });
            }
            Ok(())
        })
    }

    pub fn task_verify(&self, req: TaskVerifyRequest) -> Envelope<TaskTransitionResult> {
        wrap(self.try_task_verify(&req))
    }

    fn try_task_verify(&self, req: &TaskVerifyRequest) -> Result<TaskTransitionResult, LodestarError> {
        let now = self.now();
        let doc = self.spec.load()?;
        let task = doc.get_task(&req.task_id).ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        if task.status != TaskStatus::Done {
            return Err(LodestarError::TaskStateConflict {
                task_id: req.task_id.clone(),
                expected: TaskStatus::Done.to_string(),
                found: task.status.to_string(),
            });
        }
        let updated = self.spec.set_status(&req.task_id, TaskStatus::Verified)?;
        let newly_ready = newly_ready_ids(&req.task_id, &updated);
        let task = updated.get_task(&req.task_id).cloned();
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::append(tx, EventType::TaskVerified, Some(&req.agent_id), Some(&req.task_id), None, serde_json::json!({}), now)?;
            Ok(())
        })?;
        Ok(TaskTransitionResult { task, newly_ready_task_ids: newly_ready })
    }

    pub fn task_complete(&self, req: TaskCompleteRequest) -> Envelope<TaskTransitionResult> {
        wrap(self.try_task_complete(&req))
    }

    /// `ready -> verified` in one spec write, combining `done` and
    /// `verify` so a crash between the two steps can never strand a task
    /// in `done` (§4.K).
    fn try_task_complete(&self, req: &TaskCompleteRequest) -> Result<TaskTransitionResult, LodestarError> {
        let now = self.now();
        let doc = self.spec.load()?;
        let task = doc.get_task(&req.task_id).ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        if task.status != TaskStatus::Ready {
            return Err(LodestarError::TaskStateConflict {
                task_id: req.task_id.clone(),
                expected: TaskStatus::Ready.to_string(),
                found: task.status.to_string(),
            });
        }
        self.require_held_lease(&req.task_id, &req.agent_id, now)?;
        let updated = self.spec.set_status(&req.task_id, TaskStatus::Verified)?;
        let newly_ready = newly_ready_ids(&req.task_id, &updated);
        let task = updated.get_task(&req.task_id).cloned();
        self.runtime.with_transaction(|tx| {
            lodestar_runtime::append(tx, EventType::TaskDone, Some(&req.agent_id), Some(&req.task_id), None, serde_json::json!({ "via": "complete" }), now)?;
            lodestar_runtime::append(tx, EventType::TaskVerified, Some(&req.agent_id), Some(&req.task_id), None, serde_json::json!({ "via": "complete" }), now)?;
            Ok(())
        })?;
        Ok(TaskTransitionResult { task, newly_ready_task_ids: newly_ready })
    }

    pub fn task_context(&self, req: TaskContextRequest) -> Envelope<Option<TaskContextResult>> {
        wrap(self.try_task_context(&req).map(Some))
    }

    fn try_task_context(&self, req: &TaskContextRequest) -> Result<TaskContextResult, LodestarError> {
        let doc = self.spec.load()?;
        let task = doc.get_task(&req.task_id).ok_or_else(|| LodestarError::TaskNotFound(req.task_id.clone()))?;
        let binding = task.prd.as_ref().ok_or_else(|| LodestarError::InvalidInput {
            field: "task_id".into(),
            reason: format!("task {} has no prd binding", req.task_id),
        })?;
        let source_path = self.resolve_prd_source(&binding.source);
        let source = std::fs::read_to_string(&source_path).map_err(|e| LodestarError::InvalidInput {
            field: "prd.source".into(),
            reason: format!("cannot read {}: {e}", source_path.display()),
        })?;
        let delivered = lodestar_spec::deliver(&source, binding, req.char_budget);
        Ok(TaskContextResult {
            excerpt: delivered.excerpt,
            body: delivered.body,
            truncated: delivered.truncated,
            drift_changed: delivered.drift.changed,
            affected_refs: delivered.drift.affected_refs,
        })
    }

    pub fn task_graph(&self) -> Envelope<TaskGraphResult> {
        wrap(self.try_task_graph())
    }

    fn try_task_graph(&self) -> Result<TaskGraphResult, LodestarError> {
        let doc = self.spec.load()?;
        let edges = doc.tasks.values().flat_map(|t| t.depends_on.iter().map(move |d| (d.to_string(), t.id.to_string()))).collect();
        let topological_order = lodestar_spec::topological_order(&doc).map(|ids| ids.into_iter().map(|id| id.to_string()).collect());
        Ok(TaskGraphResult { topological_order, edges })
    }

    // --- message.* ---

    pub fn message_send(&self, req: MessageSendRequest) -> Envelope<MessageSendResult> {
        wrap(self.try_message_send(&req))
    }

    fn try_message_send(&self, req: &MessageSendRequest) -> Result<MessageSendResult, LodestarError> {
        let now = self.now();
        let message_id = self.runtime.with_transaction(|tx| {
            let id = lodestar_runtime::send(
                tx,
                &req.from_agent_id,
                req.to_type,
                &req.to_id,
                &req.body,
                req.subject.as_deref(),
                req.severity.as_deref(),
                req.task_id.as_deref(),
                now,
            )?;
            let target_agent_id = if req.to_type == RecipientType::Agent { Some(req.to_id.as_str()) } else { None };
            lodestar_runtime::append(
                tx,
                EventType::MessageSent,
                Some(&req.from_agent_id),
                req.task_id.as_deref(),
                target_agent_id,
                serde_json::json!({ "message_id": id.0 }),
                now,
            )?;
            Ok(id)
        })?;
        Ok(MessageSendResult { message_id: message_id.0 })
    }

    pub fn message_list(&self, req: MessageListRequest) -> Envelope<Vec<Message>> {
        wrap(self.try_message_list(&req))
    }

    fn try_message_list(&self, req: &MessageListRequest) -> Result<Vec<Message>, LodestarError> {
        let now = self.now();
        let filters = ListFilters {
            unread_only: req.unread_only,
            from_agent_id: req.from_agent_id.clone(),
            since: req.since,
            until: req.until,
            limit: req.limit,
            mark_read: req.mark_read,
        };
        if !req.mark_read {
            return self.runtime.with_connection(|conn| lodestar_runtime::list(conn, &req.recipient_agent_id, &filters, now));
        }
        self.runtime.with_transaction(|tx| {
            let messages = lodestar_runtime::list(tx, &req.recipient_agent_id, &filters, now)?;
            for m in &messages {
                if m.read_at.is_none() {
                    lodestar_runtime::append(
                        tx,
                        EventType::MessageRead,
                        Some(&req.recipient_agent_id),
                        m.task_id.as_deref(),
                        None,
                        serde_json::json!({ "message_id": m.message_id.0 }),
                        now,
                    )?;
                }
            }
            Ok(messages)
        })
    }

    pub fn message_thread(&self, req: MessageThreadRequest) -> Envelope<Vec<Message>> {
        wrap(self.runtime.with_connection(|conn| lodestar_runtime::thread(conn, &req.task_id, req.since, req.limit)))
    }

    pub fn message_search(&self, req: MessageSearchRequest) -> Envelope<Vec<Message>> {
        let filters = SearchFilters {
            keyword: req.keyword,
            from_agent_id: req.from_agent_id,
            since: req.since,
            until: req.until,
            limit: req.limit,
        };
        wrap(self.runtime.with_connection(|conn| lodestar_runtime::search(conn, &filters)))
    }

    pub fn message_ack(&self, req: MessageAckRequest) -> Envelope<bool> {
        wrap(self.try_message_ack(&req))
    }

    fn try_message_ack(&self, req: &MessageAckRequest) -> Result<bool, LodestarError> {
        let now = self.now();
        self.runtime.with_transaction(|tx| {
            let changed = lodestar_runtime::ack(tx, &req.agent_id, req.message_id, now)?;
            if changed {
                lodestar_runtime::append(
                    tx,
                    EventType::MessageRead,
                    Some(&req.agent_id),
                    None,
                    None,
                    serde_json::json!({ "message_id": req.message_id }),
                    now,
                )?;
            }
            Ok(changed)
        })
    }

    // --- events.pull / export.snapshot ---

    pub fn events_pull(&self, req: EventsPullRequest) -> Envelope<EventsPullResult> {
        wrap(self.try_events_pull(&req))
    }

    fn try_events_pull(&self, req: &EventsPullRequest) -> Result<EventsPullResult, LodestarError> {
        let types = req.types.as_ref().map(|ts| ts.iter().map(|s| parse_event_type(s)).collect::<Result<Vec<_>, _>>()).transpose()?;
        let (events, next_cursor) = self.runtime.with_connection(|conn| lodestar_runtime::pull(conn, req.since, req.limit, types.as_deref()))?;
        Ok(EventsPullResult { events, next_cursor })
    }

    pub fn export_snapshot(&self) -> Envelope<ExportSnapshot> {
        wrap(self.try_export_snapshot())
    }

    fn try_export_snapshot(&self) -> Result<ExportSnapshot, LodestarError> {
        let doc = self.spec.load()?;
        let tasks = doc.tasks.values().cloned().collect();
        let agents = self.runtime.with_connection(lodestar_runtime::list_agents)?;
        Ok(ExportSnapshot { tasks, agents })
    }
}

/// Create a fresh anchor directory with an empty spec and an initialized
/// runtime database (§4.A). Unlike the other operations this does not
/// need an open [`Coordinator`] — there is nothing to open yet.
pub fn init(anchor: impl Into<PathBuf>) -> Envelope<InitResult> {
    wrap(try_init(anchor.into()))
}

fn try_init(anchor: PathBuf) -> Result<InitResult, LodestarError> {
    let created = !anchor.exists();
    let paths = PathResolver::at_anchor(anchor.clone());
    lodestar_spec::init_spec_file(&paths)?;
    RuntimeStore::open(paths.runtime_path())?;
    Ok(InitResult { anchor: anchor.display().to_string(), created })
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
