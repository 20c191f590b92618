//! Thread-safe, in-memory task store.
//!
//! The sole source of truth for task state. All tool handlers and pool
//! workers go through this store; every transition is a read-check-write
//! under one exclusive lock. State is ephemeral: it lives only for the
//! duration of the relay process.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::task::model::{Task, TaskStatus};
use crate::task::types::{CheckTasksOutput, TaskResultView, TaskStatusView, TaskSummary};

#[derive(Default)]
struct StoreInner {
    tasks: HashMap<String, Task>,
    /// Insertion order for stable iteration in list/summary.
    order: Vec<String>,
}

/// Holds all tasks in memory, protected by a single mutex. Tasks live in a
/// map for O(1) lookup plus an ordered index of IDs.
///
/// Public reads return copies taken under the lock; no reference to a
/// stored task ever escapes.
#[derive(Default)]
pub struct TaskStore {
    inner: Mutex<StoreInner>,
}

impl TaskStore {
    /// Create an empty task store.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, StoreInner> {
        // The lock is never held across I/O or panicking code paths, but
        // recover from poisoning rather than propagating a panic.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a batch of tasks. The caller mints unique IDs.
    pub fn add(&self, tasks: Vec<Task>) {
        let mut inner = self.locked();
        for task in tasks {
            inner.order.push(task.id.clone());
            inner.tasks.insert(task.id.clone(), task);
        }
    }

    /// Return a copy of a single task, or None if unknown.
    pub fn get(&self, id: &str) -> Option<Task> {
        self.locked().tasks.get(id).cloned()
    }

    /// Return copies of tasks matching the filters, in insertion order.
    /// An empty `ids` slice means no ID filter; `None` tag means no tag
    /// filter; the two combine with AND logic.
    pub fn list(&self, ids: &[String], tag: Option<&str>) -> Vec<Task> {
        let inner = self.locked();
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();

        inner
            .order
            .iter()
            .filter_map(|id| inner.tasks.get(id))
            .filter(|t| id_set.is_empty() || id_set.contains(t.id.as_str()))
            .filter(|t| tag.is_none() || t.tag.as_deref() == tag)
            .cloned()
            .collect()
    }

    /// Aggregate counts and per-task statuses for `check_tasks`. No result
    /// content is included. The whole computation happens under the lock so
    /// the counts and the per-task rows describe one consistent snapshot.
    pub fn summary(&self, ids: &[String], tag: Option<&str>) -> CheckTasksOutput {
        let inner = self.locked();
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let now = Utc::now();

        let mut summary = TaskSummary::default();
        let mut tasks = Vec::new();

        for id in &inner.order {
            let Some(t) = inner.tasks.get(id) else {
                continue;
            };
            if !id_set.is_empty() && !id_set.contains(t.id.as_str()) {
                continue;
            }
            if tag.is_some() && t.tag.as_deref() != tag {
                continue;
            }
            summary.total += 1;
            match t.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Cancelled => summary.cancelled += 1,
            }
            tasks.push(TaskStatusView {
                id: t.id.clone(),
                tag: t.tag.clone(),
                status: t.status,
                error: t.error.clone(),
                output_file: t
                    .output_file
                    .as_ref()
                    .map(|p| p.display().to_string()),
                elapsed_seconds: t.elapsed_seconds(now),
            });
        }

        CheckTasksOutput { summary, tasks }
    }

    /// Full content for specific task IDs, in request order. Duplicates in
    /// the request produce duplicates in the response; unknown IDs produce
    /// a `not_found` entry.
    pub fn results(&self, ids: &[String]) -> Vec<TaskResultView> {
        let inner = self.locked();

        ids.iter()
            .map(|id| match inner.tasks.get(id) {
                Some(t) => TaskResultView {
                    id: t.id.clone(),
                    tag: t.tag.clone(),
                    status: t.status.into(),
                    content: t.result.clone(),
                    error: t.error.clone(),
                    output_file: t
                        .output_file
                        .as_ref()
                        .map(|p| p.display().to_string()),
                },
                None => TaskResultView {
                    id: id.clone(),
                    tag: None,
                    status: crate::task::types::ResultStatus::NotFound,
                    content: String::new(),
                    error: "task not found".to_string(),
                    output_file: None,
                },
            })
            .collect()
    }

    /// Mark a task as running. Returns false if the task is unknown or not
    /// pending (e.g. it was cancelled while queued). Called by a worker
    /// once it holds a semaphore slot.
    pub fn set_running(&self, id: &str) -> bool {
        let mut inner = self.locked();
        match inner.tasks.get_mut(id) {
            Some(t) if t.status == TaskStatus::Pending => {
                t.status = TaskStatus::Running;
                t.started_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Install the cancel handle for an in-flight task. Guarded: succeeds
    /// only while the task is running, so a cancel that already landed is
    /// never re-armed.
    pub fn arm_cancel(&self, id: &str, token: CancellationToken) -> bool {
        let mut inner = self.locked();
        match inner.tasks.get_mut(id) {
            Some(t) if t.status == TaskStatus::Running => {
                t.cancel = Some(token);
                true
            }
            _ => false,
        }
    }

    /// Mark a task as completed and store the engine output. Only
    /// transitions from running; a cancelled task is not overwritten.
    /// Input fields are dropped to free memory; if the output went to disk
    /// the result text is dropped too.
    pub fn set_completed(&self, id: &str, result: String) {
        let mut inner = self.locked();
        if let Some(t) = inner.tasks.get_mut(id) {
            if t.status != TaskStatus::Running {
                return;
            }
            t.status = TaskStatus::Completed;
            t.result = if t.file_written { String::new() } else { result };
            t.completed_at = Some(Utc::now());
            reclaim_inputs(t);
        }
    }

    /// Mark a task as failed. Only transitions from running.
    pub fn set_failed(&self, id: &str, err_msg: impl Into<String>) {
        let mut inner = self.locked();
        if let Some(t) = inner.tasks.get_mut(id) {
            if t.status != TaskStatus::Running {
                return;
            }
            t.status = TaskStatus::Failed;
            t.error = err_msg.into();
            t.completed_at = Some(Utc::now());
            reclaim_inputs(t);
        }
    }

    /// Mark a task as failed while preserving the engine output. Used when
    /// the engine succeeded but a later step (file write, post-command)
    /// failed, so `get_result` can still recover the text.
    pub fn set_failed_with_result(&self, id: &str, result: String, err_msg: impl Into<String>) {
        let mut inner = self.locked();
        if let Some(t) = inner.tasks.get_mut(id) {
            if t.status != TaskStatus::Running {
                return;
            }
            t.status = TaskStatus::Failed;
            t.result = result;
            t.error = err_msg.into();
            t.completed_at = Some(Utc::now());
            reclaim_inputs(t);
        }
    }

    /// Latch the file-written flag. Called by the worker after a successful
    /// write, before `set_completed`. Unknown IDs are ignored.
    pub fn set_file_written(&self, id: &str) {
        let mut inner = self.locked();
        if let Some(t) = inner.tasks.get_mut(id) {
            t.file_written = true;
        }
    }

    /// Cancel a single task, firing its cancel handle to abort any
    /// in-flight engine call. Only pending/running tasks are affected;
    /// returns true if the task actually transitioned.
    ///
    /// Input fields are cleared only for pending tasks. A running task may
    /// have a worker concurrently reading them; its fields are reclaimed
    /// when the worker would have finished (terminal absorption makes that
    /// transition a no-op, so the fields simply age out with the task).
    pub fn set_cancelled(&self, id: &str) -> bool {
        let mut inner = self.locked();
        let Some(t) = inner.tasks.get_mut(id) else {
            return false;
        };
        if t.status.is_terminal() {
            return false;
        }
        let prev = t.status;
        t.status = TaskStatus::Cancelled;
        t.completed_at = Some(Utc::now());
        if let Some(token) = t.cancel.take() {
            token.cancel();
        }
        if prev == TaskStatus::Pending {
            reclaim_inputs(t);
        }
        true
    }

    /// Cancel every task matching the filters and return how many actually
    /// transitioned. Empty filters cancel all pending/running tasks.
    pub fn cancel(&self, ids: &[String], tag: Option<&str>) -> usize {
        let targets: Vec<String> = self.list(ids, tag).into_iter().map(|t| t.id).collect();
        targets
            .iter()
            .filter(|id| self.set_cancelled(id))
            .count()
    }
}

/// Drop the request payload fields that are dead weight once a task is
/// terminal. Large batches would otherwise pin every prompt and command
/// string for the life of the process.
fn reclaim_inputs(t: &mut Task) {
    t.system_prompt = String::new();
    t.prompt = String::new();
    t.input_file = None;
    t.post_write_cmd = None;
    t.cancel = None;
}
