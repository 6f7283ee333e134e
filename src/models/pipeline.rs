//! Sequential multi-agent pipeline.
//!
//! This module provides the agent trait and the runner that calls agents one
//! after another, handing each the criteria and all earlier stage outputs.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::stage::{PipelineContext, StageOutput};
use crate::criteria::Criteria;
use crate::errors::{PipelineError, PipelineResult, StageError};
use crate::progress::ProgressReporter;

/// Trait for implementing one stage of a pipeline.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use llmpipeline::models::pipeline::Agent;
/// use llmpipeline::models::stage::{PipelineContext, StageOutput};
/// use llmpipeline::PipelineResult;
///
/// pub struct Shout;
///
/// #[async_trait]
/// impl Agent for Shout {
///     async fn run(&mut self, ctx: &PipelineContext) -> PipelineResult<StageOutput> {
///         let text = ctx.previous().map(|o| o.text.to_uppercase()).unwrap_or_default();
///         Ok(StageOutput::text(self.get_name(), text))
///     }
///
///     fn get_name(&self) -> &str {
///         "shout"
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send {
    /// Produce this stage's output from the context built so far.
    async fn run(&mut self, ctx: &PipelineContext) -> PipelineResult<StageOutput>;

    /// Stage name; unique within a pipeline.
    fn get_name(&self) -> &str;
}

/// An ordered list of agents run strictly one after another.
///
/// # Example
/// ```rust,ignore
/// use llmpipeline::{Criteria, Pipeline};
/// use llmpipeline::progress::TracingReporter;
///
/// let mut pipeline = Pipeline::new("real_estate");
/// pipeline.add_stage(Box::new(search_agent))?;
/// pipeline.add_stage(Box::new(analysis_agent))?;
///
/// let run = pipeline.run(Criteria::new().with("city", "Austin"), &TracingReporter).await?;
/// println!("{}", run.final_output().text);
/// ```
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Agent>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a stage. Stage names must be unique.
    pub fn add_stage(&mut self, agent: Box<dyn Agent>) -> PipelineResult<()> {
        let name = agent.get_name();
        if self.stages.iter().any(|s| s.get_name() == name) {
            return Err(PipelineError::DuplicateStage(name.to_string()));
        }
        self.stages.push(agent);
        Ok(())
    }

    /// Builder form of [`Pipeline::add_stage`].
    pub fn with_stage(mut self, agent: Box<dyn Agent>) -> PipelineResult<Self> {
        self.add_stage(agent)?;
        Ok(self)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.get_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order.
    ///
    /// The reporter hears about each stage before and after it runs. The
    /// first failing stage ends the run and its error is returned wrapped in
    /// [`StageError::Failed`].
    pub async fn run(
        &mut self,
        criteria: Criteria,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult<PipelineRun> {
        if self.stages.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let total = self.stages.len();
        let started = Instant::now();
        let mut ctx = PipelineContext::new(criteria);

        tracing::info!(pipeline = %self.name, stages = total, "Pipeline started");

        for (index, agent) in self.stages.iter_mut().enumerate() {
            let stage = agent.get_name().to_string();
            progress.on_stage_start(index, total, &stage);

            let stage_started = Instant::now();
            match agent.run(&ctx).await {
                Ok(mut output) => {
                    output.stage = stage.clone();
                    output.elapsed = stage_started.elapsed();
                    progress.on_stage_complete(index, total, &stage, output.elapsed);
                    ctx.push(output);
                }
                Err(err) => {
                    progress.on_stage_failed(index, total, &stage, &err.to_string());
                    tracing::warn!(pipeline = %self.name, stage = %stage, error = %err, "Pipeline stopped");
                    return Err(StageError::Failed {
                        stage,
                        source: Box::new(err),
                    }
                    .into());
                }
            }
        }

        let elapsed = started.elapsed();
        tracing::info!(
            pipeline = %self.name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Pipeline finished"
        );

        let (criteria, outputs) = ctx.into_parts();
        Ok(PipelineRun {
            pipeline: self.name.clone(),
            criteria,
            outputs,
            elapsed,
        })
    }
}

/// Outputs of a completed run. Always holds at least one stage output.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pipeline: String,
    criteria: Criteria,
    outputs: Vec<StageOutput>,
    elapsed: Duration,
}

impl PipelineRun {
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn outputs(&self) -> &[StageOutput] {
        &self.outputs
    }

    pub fn output(&self, stage: &str) -> Option<&StageOutput> {
        self.outputs.iter().find(|o| o.stage == stage)
    }

    pub fn final_output(&self) -> &StageOutput {
        // run() refuses empty pipelines and stops on the first error
        &self.outputs[self.outputs.len() - 1]
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
