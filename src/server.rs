//! Line-oriented JSON dispatch over standard streams.
//!
//! The orchestrator spawns the relay as a child process and writes one
//! request object per line; the relay answers one response object per
//! line. This layer holds no task state; it only routes to the handlers.
//! Logging goes to stderr; stdout belongs to the protocol.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::handlers::Handlers;
use crate::instructions::INSTRUCTIONS;
use crate::pool::WorkerPool;

/// One request line from the orchestrator.
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: serde_json::Value,
    tool: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct SubmitArgs {
    #[serde(default)]
    tasks: Vec<crate::task::types::TaskSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterArgs {
    #[serde(default)]
    task_ids: Vec<String>,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultArgs {
    #[serde(default)]
    task_ids: Vec<String>,
}

/// Serves tool calls over stdin/stdout until EOF or ctrl-c, then shuts the
/// pool down.
pub struct Server {
    handlers: Arc<Handlers>,
    pool: Arc<WorkerPool>,
}

impl Server {
    pub fn new(handlers: Arc<Handlers>, pool: Arc<WorkerPool>) -> Self {
        Self { handlers, pool }
    }

    /// Run the dispatch loop to completion.
    pub async fn run(self) -> std::io::Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        // The orchestrator reads this once at session start.
        let init = json!({"type": "init", "instructions": INSTRUCTIONS});
        write_line(&mut stdout, &init).await?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, shutting down");
                    break;
                }
                line = lines.next_line() => {
                    match line? {
                        None => break,
                        Some(line) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            let response = self.dispatch(&line).await;
                            write_line(&mut stdout, &response).await?;
                        }
                    }
                }
            }
        }

        self.pool.shutdown();
        Ok(())
    }

    async fn dispatch(&self, line: &str) -> serde_json::Value {
        let request: Request = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                return json!({"id": null, "error": format!("malformed request: {e}")});
            }
        };

        let id = request.id.clone();
        match self.call_tool(request).await {
            Ok(result) => json!({"id": id, "result": result}),
            Err(message) => json!({"id": id, "error": message}),
        }
    }

    async fn call_tool(&self, request: Request) -> Result<serde_json::Value, String> {
        match request.tool.as_str() {
            "list_models" => {
                let out = self
                    .handlers
                    .list_models()
                    .await
                    .map_err(|e| e.to_string())?;
                to_value(&out)
            }
            "submit_tasks" => {
                let args: SubmitArgs = parse_args(request.args)?;
                let out = self
                    .handlers
                    .submit_tasks(args.tasks)
                    .map_err(|e| e.to_string())?;
                to_value(&out)
            }
            "check_tasks" => {
                let args: FilterArgs = parse_args(request.args)?;
                to_value(&self.handlers.check_tasks(&args.task_ids, args.tag.as_deref()))
            }
            "get_result" => {
                let args: ResultArgs = parse_args(request.args)?;
                to_value(&self.handlers.get_result(&args.task_ids))
            }
            "cancel_tasks" => {
                let args: FilterArgs = parse_args(request.args)?;
                to_value(&self.handlers.cancel_tasks(&args.task_ids, args.tag.as_deref()))
            }
            other => Err(format!("unknown tool: {other}")),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned + Default>(
    args: serde_json::Value,
) -> Result<T, String> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("failed to encode response: {e}"))
}

async fn write_line(
    stdout: &mut tokio::io::Stdout,
    value: &serde_json::Value,
) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::EngineClient;
    use crate::error::EngineError;
    use crate::task::store::TaskStore;
    use crate::task::types::ModelInfo;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct MockEngine;

    #[async_trait]
    impl EngineClient for MockEngine {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, EngineError> {
            Ok(Vec::new())
        }

        async fn chat(
            &self,
            _model: &str,
            _system_prompt: &str,
            _prompt: &str,
            _deadline: Duration,
            _cancel: CancellationToken,
        ) -> Result<String, EngineError> {
            Ok("ok".to_string())
        }
    }

    fn server() -> Server {
        let store = Arc::new(TaskStore::new());
        let engine: Arc<dyn EngineClient> = Arc::new(MockEngine);
        let pool = Arc::new(WorkerPool::new(Arc::clone(&store), Arc::clone(&engine), 1));
        let handlers = Arc::new(Handlers::new(
            store,
            Arc::clone(&pool),
            engine,
            Config::default(),
        ));
        Server::new(handlers, pool)
    }

    #[tokio::test]
    async fn dispatch_routes_to_tools() {
        let srv = server();
        let resp = srv
            .dispatch(r#"{"id": 1, "tool": "check_tasks", "args": {}}"#)
            .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["summary"]["total"], 0);
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_tool() {
        let srv = server();
        let resp = srv.dispatch(r#"{"id": 2, "tool": "bogus"}"#).await;
        assert_eq!(resp["id"], 2);
        assert!(resp["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn dispatch_reports_malformed_line() {
        let srv = server();
        let resp = srv.dispatch("not json").await;
        assert!(resp["error"].as_str().unwrap().contains("malformed"));
    }

    #[tokio::test]
    async fn dispatch_submit_then_cancel_roundtrip() {
        let srv = server();
        let resp = srv
            .dispatch(
                r#"{"id": 3, "tool": "submit_tasks", "args": {"tasks": [{"system_prompt": "S", "prompt": "P", "tag": "batch"}]}}"#,
            )
            .await;
        let ids = resp["result"]["task_ids"].as_array().unwrap();
        assert_eq!(ids.len(), 1);

        let resp = srv
            .dispatch(r#"{"id": 4, "tool": "cancel_tasks", "args": {"tag": "batch"}}"#)
            .await;
        let cancelled = resp["result"]["cancelled"].as_u64().unwrap();
        assert!(cancelled <= 1);
    }
}
