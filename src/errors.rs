//! Error handling module for the llmpipeline library.
//!
//! Every area of the crate has its own error enum; [`PipelineError`] wraps
//! them all. The `Display` text of each variant is what gets shown to the
//! user, so it is kept short and readable.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the llmpipeline library
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Problems with the collected search/filter criteria
    #[error("Criteria error: {0}")]
    Criteria(#[from] CriteriaError),
    /// LLM API/network errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    /// External data fetcher errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    /// Stage execution errors
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),
    /// Repository analysis errors
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    /// Chat bridge errors
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
    /// Debt payoff planning errors
    #[error("Debt plan error: {0}")]
    Debt(#[from] DebtError),
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Pipeline has no stages
    #[error("Pipeline has no stages")]
    EmptyPipeline,
    /// Two stages share the same name
    #[error("Stage '{0}' is already part of the pipeline")]
    DuplicateStage(String),
    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// The message shown in a chat thread or terminal when a run fails.
    pub fn user_message(&self) -> String {
        format!("An error occurred: {}", self)
    }
}

/// Errors related to the collected criteria
#[derive(Debug, Error, PartialEq)]
pub enum CriteriaError {
    #[error("Required field '{0}' is missing")]
    Missing(String),
    #[error("Field '{field}' is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

/// Errors related to LLM API calls
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
    #[error("API rate limit exceeded")]
    RateLimitExceeded,
    #[error("API authentication failed")]
    AuthenticationFailed,
    #[error("API request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else if error.is_decode() {
            ApiError::InvalidResponse(error.to_string())
        } else {
            ApiError::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by an external data fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error from {service}: {message}")]
    Http { service: &'static str, message: String },
    #[error("{service} rejected the request: {message}")]
    Rejected { service: &'static str, message: String },
    #[error("{service} job {job_id} failed with status '{status}'")]
    JobFailed {
        service: &'static str,
        job_id: String,
        status: String,
    },
    #[error("{service} job {job_id} did not finish after {attempts} polls")]
    Timeout {
        service: &'static str,
        job_id: String,
        attempts: u32,
    },
    #[error("Invalid response from {service}: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

/// Errors related to agent execution
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage '{stage}' failed: {source}")]
    Failed {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },
    #[error("Placeholder '{{{0}}}' could not be resolved")]
    UnresolvedPlaceholder(String),
    #[error("Agent '{0}' returned empty output")]
    EmptyOutput(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised by the debt payoff simulation
#[derive(Debug, Error, PartialEq)]
pub enum DebtError {
    #[error("Debt '{0}' has a negative balance, rate or payment")]
    Invalid(String),
    #[error("Debt '{0}' is never paid off with the available payments")]
    NeverPaidOff(String),
}

/// Errors raised by the repository analysis tools
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Invalid issue data: {0}")]
    InvalidIssues(String),
}

/// Errors raised by the chat bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Session store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Chat API error: {0}")]
    Chat(String),
    #[error("Task {task_id} still running after {waited:?}")]
    PollTimeout { task_id: String, waited: Duration },
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },
    #[error("Could not read chat events: {0}")]
    Input(#[from] std::io::Error),
}

/// Errors related to configuration loading
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingKey(&'static str),
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),
}

/// Result type alias for llmpipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
