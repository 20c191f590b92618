//! Tool handlers: the five operations exposed to the orchestrator.
//!
//! Each handler is a thin mapping over the store, the pool, and the engine
//! client. Handlers never hold the store lock themselves and never block on
//! engine work; `submit_tasks` returns as soon as tasks are queued.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::EngineClient;
use crate::error::{Error, PoolError, Result, ValidationError};
use crate::pool::WorkerPool;
use crate::task::model::{Task, TaskStatus};
use crate::task::store::TaskStore;
use crate::task::types::{
    CancelTasksOutput, CheckTasksOutput, GetResultOutput, ListModelsOutput, SubmitTasksOutput,
    TaskSpec,
};

/// The tool surface, wired over shared state.
pub struct Handlers {
    store: Arc<TaskStore>,
    pool: Arc<WorkerPool>,
    engine: Arc<dyn EngineClient>,
    config: Config,
}

impl Handlers {
    pub fn new(
        store: Arc<TaskStore>,
        pool: Arc<WorkerPool>,
        engine: Arc<dyn EngineClient>,
        config: Config,
    ) -> Self {
        Self {
            store,
            pool,
            engine,
            config,
        }
    }

    /// `list_models`: models available in the engine.
    pub async fn list_models(&self) -> Result<ListModelsOutput> {
        let models = self.engine.list_models().await?;
        Ok(ListModelsOutput { models })
    }

    /// `submit_tasks`: validate, mint IDs, store, and enqueue a batch.
    /// Returns the minted IDs in input order. Validation covers the whole
    /// batch before any task is created.
    pub fn submit_tasks(&self, specs: Vec<TaskSpec>) -> Result<SubmitTasksOutput> {
        if self.pool.is_shutting_down() {
            return Err(Error::Pool(PoolError::ShuttingDown));
        }

        for (index, spec) in specs.iter().enumerate() {
            validate_spec(index, spec)?;
        }

        let now = Utc::now();
        let tasks: Vec<Task> = specs
            .into_iter()
            .map(|spec| self.build_task(spec, now))
            .collect();
        let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();

        tracing::info!(count = task_ids.len(), "submitting tasks");
        self.store.add(tasks);
        self.pool.enqueue(task_ids.clone())?;

        Ok(SubmitTasksOutput { task_ids })
    }

    /// `check_tasks`: aggregate counts plus per-task status rows.
    pub fn check_tasks(&self, task_ids: &[String], tag: Option<&str>) -> CheckTasksOutput {
        self.store.summary(task_ids, normalize_tag(tag))
    }

    /// `get_result`: full content for the requested IDs, in request order.
    pub fn get_result(&self, task_ids: &[String]) -> GetResultOutput {
        GetResultOutput {
            results: self.store.results(task_ids),
        }
    }

    /// `cancel_tasks`: cancel matching tasks; both filters empty cancels
    /// everything not yet terminal. Returns the number that actually
    /// transitioned.
    pub fn cancel_tasks(&self, task_ids: &[String], tag: Option<&str>) -> CancelTasksOutput {
        let cancelled = self.store.cancel(task_ids, normalize_tag(tag));
        tracing::info!(cancelled, "cancel_tasks");
        CancelTasksOutput { cancelled }
    }

    fn build_task(&self, spec: TaskSpec, now: chrono::DateTime<Utc>) -> Task {
        Task {
            id: format!("task-{}", Uuid::new_v4().simple()),
            tag: non_empty(spec.tag),
            system_prompt: spec.system_prompt,
            prompt: spec.prompt,
            model: non_empty(spec.model).unwrap_or_else(|| self.config.default_model.clone()),
            response_hint: spec.response_hint,
            input_file: non_empty(spec.input_file).map(PathBuf::from),
            output_file: non_empty(spec.output_file).map(PathBuf::from),
            strip_markdown_fences: spec.strip_markdown_fences.unwrap_or(true),
            post_write_cmd: non_empty(spec.post_write_cmd),
            timeout: spec
                .timeout_seconds
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(self.config.task_timeout),
            status: TaskStatus::Pending,
            result: String::new(),
            error: String::new(),
            file_written: false,
            cancel: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

fn validate_spec(index: usize, spec: &TaskSpec) -> std::result::Result<(), ValidationError> {
    if spec.system_prompt.trim().is_empty() {
        return Err(ValidationError::MissingField {
            index,
            field: "system_prompt",
        });
    }
    if spec.prompt.trim().is_empty() {
        return Err(ValidationError::MissingField {
            index,
            field: "prompt",
        });
    }
    for (field, value) in [
        ("input_file", &spec.input_file),
        ("output_file", &spec.output_file),
    ] {
        if let Some(path) = value.as_deref().filter(|p| !p.trim().is_empty()) {
            if !Path::new(path).is_absolute() {
                return Err(ValidationError::RelativePath {
                    index,
                    field,
                    path: path.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Treat empty and whitespace-only strings as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_tag(tag: Option<&str>) -> Option<&str> {
    tag.filter(|t| !t.trim().is_empty())
}
