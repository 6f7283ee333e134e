//! Agent wrapping a plain function, for deterministic local steps.

use async_trait::async_trait;

use crate::errors::PipelineResult;
use crate::models::pipeline::Agent;
use crate::models::stage::{PipelineContext, StageOutput};

type StageFn = dyn Fn(&PipelineContext) -> PipelineResult<String> + Send + Sync;

/// A stage computed locally from the context, no model involved.
///
/// # Example
/// ```rust
/// use llmpipeline::agents::FnAgent;
///
/// let word_count = FnAgent::new("word_count", |ctx| {
///     let words = ctx.previous().map(|o| o.text.split_whitespace().count()).unwrap_or(0);
///     Ok(format!("{} words", words))
/// });
/// ```
pub struct FnAgent {
    name: String,
    processor: Box<StageFn>,
}

impl FnAgent {
    pub fn new<F>(name: impl Into<String>, processor: F) -> Self
    where
        F: Fn(&PipelineContext) -> PipelineResult<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            processor: Box::new(processor),
        }
    }
}

#[async_trait]
impl Agent for FnAgent {
    async fn run(&mut self, ctx: &PipelineContext) -> PipelineResult<StageOutput> {
        let text = (self.processor)(ctx)?;
        Ok(StageOutput::text(&self.name, text))
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}
