//! Configuration types.

use std::time::Duration;

/// Hard wall clock for `post_write_cmd` subprocesses.
pub const POST_CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Relay configuration. All knobs come from the environment; defaults are
/// sized for a single local Ollama instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the text-generation engine.
    pub ollama_host: String,
    /// Maximum number of tasks running concurrently (semaphore size).
    pub worker_concurrency: usize,
    /// Model used when a task omits `model`.
    pub default_model: String,
    /// Default per-task timeout.
    pub task_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_host: "http://127.0.0.1:11434".to_string(),
            worker_concurrency: 2,
            default_model: "qwen2.5-coder:14b".to_string(),
            task_timeout: Duration::from_secs(600),
        }
    }
}

impl Config {
    /// Build a Config from environment variables. Unset or unparseable
    /// values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ollama_host: std::env::var("OLLAMA_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.ollama_host),
            worker_concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.worker_concurrency),
            default_model: std::env::var("DEFAULT_MODEL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.default_model),
            task_timeout: std::env::var("TASK_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.task_timeout),
        }
    }
}
