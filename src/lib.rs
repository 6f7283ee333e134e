//! LLMPipeline - Sequential Multi-Agent Pipelines
//!
//! This library runs a fixed sequence of agents over user-supplied criteria:
//! a data fetcher pulls records from a scraping or search API, then LLM
//! agents analyse what earlier stages produced. Ready-made teams live in
//! [`apps`]; repository analysis tools and a chat bridge ship alongside.

pub mod agents;
pub mod analysis;
pub mod apps;
pub mod bridge;
pub mod config;
pub mod criteria;
pub mod errors;
pub mod fetch;
pub mod generate;
pub mod models;
pub mod progress;
pub mod render;

// Re-export commonly used types for convenience
pub use config::Config;
pub use criteria::{Criteria, CriteriaValue};
pub use errors::{PipelineError, PipelineResult};
pub use generate::{ChatClient, ChatModel, ChatRequest};
pub use models::pipeline::{Agent, Pipeline, PipelineRun};
pub use models::stage::{PipelineContext, StageOutput};
pub use progress::ProgressReporter;

#[cfg(test)]
mod fake_server;
#[cfg(test)]
mod tests;
