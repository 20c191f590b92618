//! Engine client abstraction.
//!
//! The relay treats the text-generation engine as a black box with two
//! operations. The trait keeps the worker pool and handlers testable
//! without any network.

pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::task::types::ModelInfo;

pub use ollama::OllamaClient;

/// Contract over the text-generation HTTP service.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// List the models available in the engine.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, EngineError>;

    /// Run one chat completion. Must honor both the deadline and the cancel
    /// token; on cancellation it returns promptly with
    /// [`EngineError::Cancelled`].
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Result<String, EngineError>;
}
