//! Agent that runs an external data fetcher as a pipeline stage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::criteria::Criteria;
use crate::errors::{PipelineResult, StageError};
use crate::fetch::{DataFetcher, ExtractedRecord, FetchRequest};
use crate::models::pipeline::Agent;
use crate::models::stage::{PipelineContext, StageOutput};

/// Turns the criteria into a fetch request.
pub type RequestBuilder = dyn Fn(&Criteria) -> PipelineResult<FetchRequest> + Send + Sync;

/// Stage whose output is the fetched records, as pretty JSON text.
pub struct FetchAgent {
    name: String,
    fetcher: Arc<dyn DataFetcher>,
    build_request: Box<RequestBuilder>,
    require_records: bool,
}

impl FetchAgent {
    pub fn new<F>(name: impl Into<String>, fetcher: Arc<dyn DataFetcher>, build_request: F) -> Self
    where
        F: Fn(&Criteria) -> PipelineResult<FetchRequest> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fetcher,
            build_request: Box::new(build_request),
            require_records: false,
        }
    }

    /// Fail the stage when the fetcher finds nothing.
    pub fn require_records(mut self, require: bool) -> Self {
        self.require_records = require;
        self
    }
}

#[async_trait]
impl Agent for FetchAgent {
    async fn run(&mut self, ctx: &PipelineContext) -> PipelineResult<StageOutput> {
        let request = (self.build_request)(ctx.criteria())?;
        let data = self.fetcher.fetch(&request).await?;

        tracing::info!(
            agent = %self.name,
            fetcher = %self.fetcher.name(),
            records = data.records.len(),
            "Fetched records"
        );

        if self.require_records && data.records.is_empty() {
            return Err(StageError::EmptyOutput(self.name.clone()).into());
        }

        let text = serde_json::to_string_pretty::<Vec<ExtractedRecord>>(&data.records)?;
        Ok(StageOutput::text(&self.name, text).with_records(data.records))
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}
