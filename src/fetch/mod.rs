//! External data fetchers: scraping and search APIs that return records.

pub mod exa;
pub mod firecrawl;
pub mod schema;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::FetchError;

pub use exa::{ExaSearcher, SEARCH_RESULT_FIELDS};
pub use firecrawl::FirecrawlExtractor;
pub use schema::{locate_records, ExtractedRecord, ExtractionSchema, FieldType, PLACEHOLDER};

/// What to fetch: target URLs, a natural-language extraction prompt and the
/// schema hint for the result.
///
/// Search fetchers read `query` when set and fall back to `prompt`.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub urls: Vec<String>,
    pub prompt: String,
    pub query: Option<String>,
    pub schema: ExtractionSchema,
}

impl FetchRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn with_schema(mut self, schema: ExtractionSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn search_query(&self) -> &str {
        self.query.as_deref().unwrap_or(&self.prompt)
    }
}

/// Result of one fetch: the located records plus the untouched payload.
#[derive(Debug, Clone)]
pub struct FetchedData {
    pub source: String,
    pub records: Vec<ExtractedRecord>,
    pub raw: Value,
}

/// A third-party API that turns a [`FetchRequest`] into records.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedData, FetchError>;

    fn name(&self) -> &str;
}

/// Fetcher returning canned records, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    records: Vec<ExtractedRecord>,
}

impl StaticFetcher {
    pub fn new(records: Vec<ExtractedRecord>) -> Self {
        Self { records }
    }

    /// Build from a JSON payload using the same record lookup as live fetchers.
    pub fn from_json(data: &Value, collection: Option<&str>) -> Self {
        Self::new(locate_records(data, collection))
    }
}

#[async_trait]
impl DataFetcher for StaticFetcher {
    async fn fetch(&self, _request: &FetchRequest) -> Result<FetchedData, FetchError> {
        Ok(FetchedData {
            source: "static".to_string(),
            raw: Value::Array(self.records.iter().map(|r| r.as_value()).collect()),
            records: self.records.clone(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}
