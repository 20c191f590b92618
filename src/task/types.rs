//! Wire types for the five tool operations.
//!
//! These are the only shapes serialized to the orchestrator. They carry no
//! references into the store; every view is a copy taken under the store
//! lock.

use serde::{Deserialize, Serialize};

use crate::task::model::TaskStatus;

/// Advisory hint about how the orchestrator intends to consume the result.
/// Has no behavioral effect in the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseHint {
    StatusOnly,
    Content,
    Json,
}

/// One task entry in a `submit_tasks` request.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    /// Required system prompt.
    pub system_prompt: String,
    /// Required user prompt.
    pub prompt: String,
    /// Absolute path whose contents are appended to the prompt.
    #[serde(default)]
    pub input_file: Option<String>,
    /// Absolute path the result is written to. Concurrent tasks writing the
    /// same path are not prevented; last writer wins.
    #[serde(default)]
    pub output_file: Option<String>,
    /// Strip one pair of enclosing markdown fences from the engine output.
    /// Defaults to true.
    #[serde(default)]
    pub strip_markdown_fences: Option<bool>,
    /// Shell command executed after a successful file write.
    #[serde(default)]
    pub post_write_cmd: Option<String>,
    /// Engine model; defaults from config.
    #[serde(default)]
    pub model: Option<String>,
    /// Grouping label for batch queries and cancellation.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub response_hint: Option<ResponseHint>,
    /// Per-task timeout in seconds; defaults from config.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Output of `submit_tasks`: minted IDs in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTasksOutput {
    pub task_ids: Vec<String>,
}

/// Aggregate counts across all matched tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Per-task view in `check_tasks`. Intentionally omits the result content;
/// use `get_result` for that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub status: TaskStatus,
    /// Brief error message if failed.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub error: String,
    /// Path the output was written to, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Wall-clock seconds; meaning varies by status.
    pub elapsed_seconds: i64,
}

/// Output of `check_tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTasksOutput {
    pub summary: TaskSummary,
    pub tasks: Vec<TaskStatusView>,
}

/// Status reported per entry by `get_result`. Extends the lifecycle states
/// with `not_found` for unknown IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    NotFound,
}

impl From<TaskStatus> for ResultStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::Running => Self::Running,
            TaskStatus::Completed => Self::Completed,
            TaskStatus::Failed => Self::Failed,
            TaskStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Full result for a single task, as returned by `get_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub status: ResultStatus,
    /// Full engine response. Empty if the output went to `output_file`.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

/// Output of `get_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResultOutput {
    pub results: Vec<TaskResultView>,
}

/// Output of `cancel_tasks`: how many tasks actually transitioned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CancelTasksOutput {
    pub cancelled: usize,
}

/// A single engine model, as surfaced by `list_models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// e.g. "14B", "7B".
    pub parameter_size: String,
    /// e.g. "Q4_K_M".
    pub quantization_level: String,
    /// e.g. "qwen2".
    pub family: String,
}

/// Output of `list_models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListModelsOutput {
    pub models: Vec<ModelInfo>,
}
