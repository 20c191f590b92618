use std::sync::Arc;

use ollama_relay::config::Config;
use ollama_relay::engine::{EngineClient, OllamaClient};
use ollama_relay::handlers::Handlers;
use ollama_relay::pool::WorkerPool;
use ollama_relay::server::Server;
use ollama_relay::task::TaskStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Stdout carries the protocol stream; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::from_env();
    tracing::info!(
        host = %config.ollama_host,
        concurrency = config.worker_concurrency,
        model = %config.default_model,
        timeout_secs = config.task_timeout.as_secs(),
        "ollama-relay starting"
    );

    let store = Arc::new(TaskStore::new());
    let engine: Arc<dyn EngineClient> = Arc::new(OllamaClient::new(config.ollama_host.clone()));
    let pool = Arc::new(WorkerPool::new(
        Arc::clone(&store),
        Arc::clone(&engine),
        config.worker_concurrency,
    ));
    let handlers = Arc::new(Handlers::new(store, Arc::clone(&pool), engine, config));

    Server::new(handlers, pool).run().await?;
    Ok(())
}
