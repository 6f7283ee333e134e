//! Chat-model access for hosted LLM providers.

#[allow(clippy::module_inception)]
pub mod generate;
pub mod provider;

pub use generate::{generate, ChatClient, ChatModel, ChatRequest, Message};
pub use provider::{Provider, WireFormat};
