//! ollama-relay: batch task relay between a planning LLM and a local
//! Ollama instance.
//!
//! The orchestrator submits batches of text-transformation tasks; the relay
//! runs them through a bounded worker pool against the local engine and
//! answers lightweight status queries. All state is in memory and dies with
//! the process.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod instructions;
pub mod pool;
pub mod server;
pub mod task;
