// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

//! The spec store (§4.C): load/validate/atomically rewrite the YAML task
//! spec under an exclusive cross-process file lock. Every mutating call
//! re-reads from disk first — there is no cache across write barriers.

use crate::dag;
use crate::document::SpecDocument;
use fs2::FileExt;
use lodestar_core::{LodestarError, PathResolver, SpecInvariant, Task, TaskStatus};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct SpecStore {
    paths: PathResolver,
    lock_timeout: Duration,
}

/// Holds the sentinel file lock for the lifetime of one mutation.
struct SpecLock {
    file: File,
}

impl Drop for SpecLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl SpecStore {
    pub fn new(paths: PathResolver, lock_timeout: Duration) -> Self {
        Self { paths, lock_timeout }
    }

    fn acquire_lock(&self) -> Result<SpecLock, LodestarError> {
        let lock_path = self.paths.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot open lock file: {e}") })?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(SpecLock { file }),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if started.elapsed() >= self.lock_timeout {
                        return Err(LodestarError::LockTimeout { waited_ms: started.elapsed().as_millis() as u64 });
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(LodestarError::RuntimeCorrupt { reason: format!("lock error: {e}") });
                }
            }
        }
    }

    /// Read the document. Does not take the lock; tolerates a concurrent
    /// writer's rename by retrying once on read error (§4.C).
    pub fn load(&self) -> Result<SpecDocument, LodestarError> {
        let path = self.paths.spec_path();
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => fs::read_to_string(&path)
                .map_err(|e| LodestarError::SpecMalformed { reason: format!("cannot read spec: {e}") })?,
        };
        serde_yaml::from_str(&contents).map_err(|e| LodestarError::SpecMalformed { reason: e.to_string() })
    }

    fn validate(doc: &SpecDocument) -> Result<(), LodestarError> {
        if let Some(cycle) = dag::detect_cycles(doc) {
            return Err(SpecInvariant::Cycle(cycle.iter().map(|id| id.to_string()).collect()).into());
        }
        if let Some(missing) = dag::missing_deps(doc).into_iter().next() {
            return Err(SpecInvariant::MissingDep {
                task: missing.task.to_string(),
                missing: missing.missing.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Serialize `doc` and atomically replace the spec file (write-to-temp
    /// then rename on the same filesystem), while holding `_lock`.
    fn write_locked(&self, doc: &SpecDocument, _lock: &SpecLock) -> Result<(), LodestarError> {
        Self::validate(doc)?;
        let yaml = serde_yaml::to_string(doc)
            .map_err(|e| LodestarError::SpecMalformed { reason: format!("cannot serialize spec: {e}") })?;
        let path = self.paths.spec_path();
        let tmp_path = path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot write temp spec: {e}") })?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot rename spec into place: {e}") })?;
        Ok(())
    }

    /// Overwrite the whole document under the lock. Used by `init` and by
    /// tests; production mutations should prefer the narrower helpers below
    /// so each only re-validates what it touched.
    pub fn save(&self, doc: &SpecDocument) -> Result<(), LodestarError> {
        let lock = self.acquire_lock()?;
        self.write_locked(doc, &lock)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>, LodestarError> {
        Ok(self.load()?.tasks.get(task_id).cloned())
    }

    pub fn upsert_task(&self, task: Task) -> Result<SpecDocument, LodestarError> {
        let lock = self.acquire_lock()?;
        let mut doc = self.load()?;
        doc.upsert_task(task);
        self.write_locked(&doc, &lock)?;
        Ok(doc)
    }

    /// Soft-delete a task. With `cascade = false`, rejects if the task has
    /// live dependents. With `cascade = true`, soft-deletes every
    /// transitive dependent too.
    pub fn soft_delete_task(&self, task_id: &str, cascade: bool) -> Result<SpecDocument, LodestarError> {
        let lock = self.acquire_lock()?;
        let mut doc = self.load()?;
        if !doc.has_live_task(task_id) {
            return Err(LodestarError::TaskNotFound(task_id.to_string()));
        }
        let dependents = dag::transitive_dependents(task_id, &doc);
        let live_dependents: Vec<_> = dependents.iter().filter(|d| doc.has_live_task(d.as_str())).collect();
        if !live_dependents.is_empty() && !cascade {
            return Err(LodestarError::InvalidInput {
                field: "task_id".into(),
                reason: format!("task {task_id} has live dependents; pass cascade=true to delete them too"),
            });
        }
        if let Some(task) = doc.tasks.get_mut(task_id) {
            task.status = TaskStatus::Deleted;
        }
        if cascade {
            for dep in &live_dependents {
                if let Some(task) = doc.tasks.get_mut(dep.as_str()) {
                    task.status = TaskStatus::Deleted;
                }
            }
        }
        self.write_locked(&doc, &lock)?;
        Ok(doc)
    }

    pub fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<SpecDocument, LodestarError> {
        let lock = self.acquire_lock()?;
        let mut doc = self.load()?;
        let task = doc
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| LodestarError::TaskNotFound(task_id.to_string()))?;
        task.status = status;
        self.write_locked(&doc, &lock)?;
        Ok(doc)
    }

    pub fn path_resolver(&self) -> &PathResolver {
        &self.paths
    }
}

/// Create a fresh anchor directory with an empty spec (one default project,
/// no tasks), per §4.A `init`.
pub fn init_spec_file(paths: &PathResolver) -> Result<(), LodestarError> {
    fs::create_dir_all(paths.anchor())
        .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot create anchor dir: {e}") })?;
    let doc = SpecDocument::default();
    let yaml = serde_yaml::to_string(&doc)
        .map_err(|e| LodestarError::SpecMalformed { reason: format!("cannot serialize empty spec: {e}") })?;
    fs::write(paths.spec_path(), yaml)
        .map_err(|e| LodestarError::RuntimeCorrupt { reason: format!("cannot write initial spec: {e}") })?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
