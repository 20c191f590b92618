//! Bounded-concurrency worker pool.
//!
//! Executes each submitted task through the full pipeline (read input,
//! call the engine, sanitize, write output, run the post-write command)
//! with at most K pipelines in flight. Every state transition goes through
//! the store's guarded setters, so a task cancelled mid-flight is never
//! overwritten.

pub mod sanitize;

use std::process::Stdio;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::POST_CMD_TIMEOUT;
use crate::engine::EngineClient;
use crate::error::PoolError;
use crate::task::model::Task;
use crate::task::store::TaskStore;

pub use sanitize::strip_markdown_fences;

/// How much captured subprocess output goes into a failure message.
const POST_CMD_OUTPUT_EXCERPT: usize = 500;

/// Dispatches tasks to workers, bounded by a counting semaphore sized to
/// what the engine's GPU can take.
pub struct WorkerPool {
    store: Arc<TaskStore>,
    engine: Arc<dyn EngineClient>,
    semaphore: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Create a pool admitting at most `concurrency` tasks simultaneously.
    pub fn new(store: Arc<TaskStore>, engine: Arc<dyn EngineClient>, concurrency: usize) -> Self {
        Self {
            store,
            engine,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            shutdown: CancellationToken::new(),
        }
    }

    /// Enqueue tasks by ID. Returns immediately; the pipelines run on
    /// spawned workers. Fails once shutdown has begun.
    pub fn enqueue(&self, ids: Vec<String>) -> Result<(), PoolError> {
        if self.shutdown.is_cancelled() {
            return Err(PoolError::ShuttingDown);
        }
        for id in ids {
            let store = Arc::clone(&self.store);
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&self.semaphore);
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                run_task(store, engine, semaphore, shutdown, id).await;
            });
        }
        Ok(())
    }

    /// Stop admitting work and cancel everything not yet terminal. Workers
    /// blocked on the semaphore wake up and bail; in-flight engine calls
    /// abort through their cancel handles.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let cancelled = self.store.cancel(&[], None);
        tracing::info!(cancelled, "worker pool shut down");
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// One task's trip through the pipeline. Errors land on the task via the
/// store; this function never returns them.
async fn run_task(
    store: Arc<TaskStore>,
    engine: Arc<dyn EngineClient>,
    semaphore: Arc<Semaphore>,
    shutdown: CancellationToken,
    id: String,
) {
    let _permit = tokio::select! {
        biased;
        () = shutdown.cancelled() => return,
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
    };

    // The guard fails when the task was cancelled while queued. Its status
    // is already terminal; just give the slot back.
    if !store.set_running(&id) {
        tracing::debug!(task = %id, "skipping task no longer pending");
        return;
    }

    // Snapshot the request fields. Reclaim never touches them while the
    // task is running, and a concurrent running-cancel preserves them too.
    let Some(task) = store.get(&id) else {
        return;
    };

    // Arm the cancel handle before any external call so an incoming cancel
    // can abort the engine request. Fails if a cancel already landed.
    let cancel = CancellationToken::new();
    if !store.arm_cancel(&id, cancel.clone()) {
        tracing::debug!(task = %id, "cancelled before pipeline start");
        return;
    }

    tracing::debug!(task = %id, model = %task.model, "pipeline started");
    execute_pipeline(&store, engine.as_ref(), &task, cancel).await;
}

async fn execute_pipeline(
    store: &TaskStore,
    engine: &dyn EngineClient,
    task: &Task,
    cancel: CancellationToken,
) {
    let id = &task.id;

    let mut user_prompt = task.prompt.clone();
    if let Some(path) = &task.input_file {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                user_prompt.push_str("\n\n");
                user_prompt.push_str(&contents);
            }
            Err(e) => {
                store.set_failed(
                    id,
                    format!("failed to read input file {}: {e}", path.display()),
                );
                return;
            }
        }
    }

    let raw = match engine
        .chat(
            &task.model,
            &task.system_prompt,
            &user_prompt,
            task.timeout,
            cancel.clone(),
        )
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(task = %id, error = %e, "engine call failed");
            store.set_failed(id, e.to_string());
            return;
        }
    };

    let result = if task.strip_markdown_fences {
        strip_markdown_fences(&raw)
    } else {
        raw
    };

    if let Some(path) = &task.output_file {
        if let Err(e) = tokio::fs::write(path, &result).await {
            store.set_failed_with_result(
                id,
                result,
                format!("failed to write output file {}: {e}", path.display()),
            );
            return;
        }
        store.set_file_written(id);
    }

    if let Some(cmd) = &task.post_write_cmd {
        let post = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            post = run_post_write_cmd(cmd) => post,
        };
        if let Err(msg) = post {
            store.set_failed_with_result(id, result, msg);
            return;
        }
    }

    tracing::debug!(task = %id, "pipeline completed");
    store.set_completed(id, result);
}

/// Run the post-write command through the system shell with a hard wall
/// clock, capturing combined stdout/stderr. The command string is passed
/// through opaquely; callers sanitize their own inputs.
async fn run_post_write_cmd(cmd: &str) -> Result<(), String> {
    let mut command = tokio::process::Command::new("sh");
    command
        .args(["-c", cmd])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(POST_CMD_TIMEOUT, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("failed to run post-write command: {e}")),
        Err(_) => {
            return Err(format!(
                "post-write command timed out after {}s",
                POST_CMD_TIMEOUT.as_secs()
            ));
        }
    };

    if output.status.success() {
        return Ok(());
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }
    Err(format!(
        "post-write command exited with code {}: {}",
        output.status.code().unwrap_or(-1),
        excerpt(&combined, POST_CMD_OUTPUT_EXCERPT)
    ))
}

/// First `max_chars` characters of captured output, for error messages.
fn excerpt(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
