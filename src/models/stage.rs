//! Typed data passed between pipeline stages.

use std::time::Duration;

use serde::Serialize;

use crate::criteria::Criteria;
use crate::fetch::ExtractedRecord;

/// What one stage produced.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutput {
    /// Name of the stage that produced this output
    pub stage: String,
    /// Free text (LLM answer or formatted records)
    pub text: String,
    /// Records, when the stage fetched structured data
    pub records: Vec<ExtractedRecord>,
    /// Wall time spent in the stage; filled in by the pipeline
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

impl StageOutput {
    pub fn text(stage: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            text: text.into(),
            records: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_records(mut self, records: Vec<ExtractedRecord>) -> Self {
        self.records = records;
        self
    }
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Everything a stage may read: the criteria and every earlier output.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    criteria: Criteria,
    outputs: Vec<StageOutput>,
}

impl PipelineContext {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            outputs: Vec::new(),
        }
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

    /// Output of the most recent stage.
    pub fn previous(&self) -> Option<&StageOutput> {
        self.outputs.last()
    }

    pub(crate) fn push(&mut self, output: StageOutput) {
        self.outputs.push(output);
    }

    pub(crate) fn into_parts(self) -> (Criteria, Vec<StageOutput>) {
        (self.criteria, self.outputs)
    }
}
