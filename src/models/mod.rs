pub mod pipeline;
pub mod prompt;
pub mod stage;

pub use pipeline::{Agent, Pipeline, PipelineRun};
pub use prompt::PromptTemplate;
pub use stage::{PipelineContext, StageOutput};
