//! Built-in agent implementations.

pub mod fetch;
pub mod func;
pub mod llm;

pub use fetch::FetchAgent;
pub use func::FnAgent;
pub use llm::LlmAgent;
