//! Task model and lifecycle state machine.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::task::types::ResponseHint;

/// Lifecycle state of a task.
///
/// Legal paths: `pending -> running -> completed | failed`, and
/// `pending | running -> cancelled`. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for a worker slot.
    Pending,
    /// A worker is executing the pipeline.
    Running,
    /// Pipeline finished; result available (or on disk).
    Completed,
    /// A pipeline step failed; `error` carries the attribution.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl TaskStatus {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    /// Check if this is a terminal state. Terminal states never change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One unit of work: a prompt pair plus optional file I/O and
/// post-processing. Identity fields are fixed at submission; lifecycle
/// fields are mutated only by the store under its lock.
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task ID, minted at submission.
    pub id: String,
    /// Caller-supplied grouping label.
    pub tag: Option<String>,
    /// System prompt sent to the engine.
    pub system_prompt: String,
    /// User prompt sent to the engine (file contents are appended).
    pub prompt: String,
    /// Engine model identifier.
    pub model: String,
    /// Advisory hint about the expected response shape.
    pub response_hint: Option<ResponseHint>,
    /// Absolute path read and appended to the prompt.
    pub input_file: Option<PathBuf>,
    /// Absolute path the sanitized result is written to.
    pub output_file: Option<PathBuf>,
    /// Strip a single pair of enclosing markdown fences from the output.
    pub strip_markdown_fences: bool,
    /// Shell command run after a successful file write.
    pub post_write_cmd: Option<String>,
    /// Deadline for the engine call.
    pub timeout: Duration,

    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Full engine output (cleared once written to `output_file`).
    pub result: String,
    /// Brief failure message.
    pub error: String,
    /// Latched by the worker after a successful file write.
    pub file_written: bool,
    /// Aborts the in-flight engine call. Present only while running.
    pub cancel: Option<CancellationToken>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Wall-clock seconds for this task. The meaning depends on status:
    /// queue wait while pending, work-so-far while running, and the fixed
    /// start-to-completion span once terminal. A task cancelled before it
    /// ever started reports 0.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self.status {
            TaskStatus::Pending => (now - self.created_at).num_seconds(),
            TaskStatus::Running => self
                .started_at
                .map(|s| (now - s).num_seconds())
                .unwrap_or(0),
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {
                match (self.started_at, self.completed_at) {
                    (Some(start), Some(end)) => (end - start).num_seconds(),
                    _ => 0,
                }
            }
        }
    }
}
