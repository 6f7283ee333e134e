//! LLM-backed agent: a system prompt, a prompt template and a model handle.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{PipelineResult, StageError};
use crate::generate::{ChatModel, ChatRequest};
use crate::models::pipeline::Agent;
use crate::models::prompt::PromptTemplate;
use crate::models::stage::{PipelineContext, StageOutput};

/// Agent that renders its prompt from the context and asks a model.
///
/// # Example
/// ```rust,ignore
/// use llmpipeline::agents::LlmAgent;
///
/// let analyst = LlmAgent::new("market_analysis", model.clone())
///     .with_instructions("You are a real estate market analyst.")
///     .with_prompt("Analyse the market in {criteria.city}.\n\nListings:\n{stage.property_search}")
///     .with_temperature(0.3);
/// ```
pub struct LlmAgent {
    name: String,
    instructions: Option<String>,
    prompt: PromptTemplate,
    model: Arc<dyn ChatModel>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmAgent {
    /// New agent whose prompt is just the previous stage's text.
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            prompt: PromptTemplate::new("{previous}"),
            model,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Set the system prompt
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<PromptTemplate>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }
}

#[async_trait]
impl Agent for LlmAgent {
    async fn run(&mut self, ctx: &PipelineContext) -> PipelineResult<StageOutput> {
        let prompt = self.prompt.render(ctx)?;

        let mut request = ChatRequest::new(prompt).with_temperature(self.temperature);
        if let Some(instructions) = &self.instructions {
            request = request.with_system(instructions.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(agent = %self.name, model = %self.model.model_name(), "Calling model");
        let text = self.model.complete(request).await?;
        if text.trim().is_empty() {
            return Err(StageError::EmptyOutput(self.name.clone()).into());
        }

        Ok(StageOutput::text(&self.name, text))
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}
