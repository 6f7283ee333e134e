//! Firecrawl `/extract` fetcher.
//!
//! Extraction runs as a job on Firecrawl's side: the start call either
//! returns data right away or a job id that is polled until it finishes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::schema::locate_records;
use super::{DataFetcher, FetchRequest, FetchedData};
use crate::errors::FetchError;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";
const SERVICE: &str = "Firecrawl";

#[derive(Serialize)]
struct ExtractRequest<'a> {
    urls: &'a [String],
    prompt: &'a str,
    schema: Value,
}

/// How an extract response should be handled.
#[derive(Debug, PartialEq)]
pub(crate) enum ExtractStep {
    Done(Value),
    Pending(String),
    Failed(String),
}

/// Fetcher backed by Firecrawl's LLM extraction endpoint.
///
/// # Example
/// ```rust,ignore
/// use llmpipeline::fetch::{FirecrawlExtractor, FetchRequest, DataFetcher};
///
/// let extractor = FirecrawlExtractor::new(api_key, Duration::from_secs(120))?
///     .with_poll_interval(Duration::from_secs(2));
/// let data = extractor.fetch(&FetchRequest::new("List the homes").with_urls(urls)).await?;
/// ```
pub struct FirecrawlExtractor {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl FirecrawlExtractor {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| http_error(&e))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
            poll_interval: Duration::from_secs(5),
            max_polls: 60,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, FetchError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| http_error(&e))?;
        if !status.is_success() {
            return Err(FetchError::Http {
                service: SERVICE,
                message: format!("{} - {}", status, text.trim()),
            });
        }
        serde_json::from_str(&text).map_err(|e| FetchError::InvalidResponse {
            service: SERVICE,
            message: e.to_string(),
        })
    }

    async fn start(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        let body = ExtractRequest {
            urls: &request.urls,
            prompt: &request.prompt,
            schema: request.schema.to_json(),
        };
        let response = self
            .client
            .post(format!("{}/v1/extract", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(&e))?;
        Self::read_json(response).await
    }

    async fn status(&self, job_id: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(format!("{}/v1/extract/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| http_error(&e))?;
        Self::read_json(response).await
    }

    async fn wait_for(&self, job_id: String) -> Result<Value, FetchError> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let body = self.status(&job_id).await?;
            match interpret_extract_response(&body)? {
                ExtractStep::Done(data) => return Ok(data),
                ExtractStep::Failed(status) => {
                    return Err(FetchError::JobFailed {
                        service: SERVICE,
                        job_id,
                        status,
                    })
                }
                ExtractStep::Pending(_) => {
                    if attempt % 6 == 0 {
                        tracing::info!(job_id = %job_id, attempt, "Extraction still running");
                    }
                }
            }
        }

        Err(FetchError::Timeout {
            service: SERVICE,
            job_id,
            attempts: self.max_polls,
        })
    }
}

fn http_error(error: &reqwest::Error) -> FetchError {
    FetchError::Http {
        service: SERVICE,
        message: error.to_string(),
    }
}

/// Classify a start or status response.
pub(crate) fn interpret_extract_response(body: &Value) -> Result<ExtractStep, FetchError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(FetchError::Rejected {
            service: SERVICE,
            message,
        });
    }

    let status = body.get("status").and_then(Value::as_str);
    match status {
        Some("failed") | Some("cancelled") => {
            return Ok(ExtractStep::Failed(status.unwrap_or_default().to_string()))
        }
        Some("processing") | Some("pending") => {
            let id = body.get("id").and_then(Value::as_str).unwrap_or_default();
            return Ok(ExtractStep::Pending(id.to_string()));
        }
        _ => {}
    }

    if let Some(data) = body.get("data").filter(|d| !d.is_null()) {
        return Ok(ExtractStep::Done(data.clone()));
    }

    match body.get("id").and_then(Value::as_str) {
        Some(id) => Ok(ExtractStep::Pending(id.to_string())),
        None => Err(FetchError::InvalidResponse {
            service: SERVICE,
            message: "response has neither data nor a job id".to_string(),
        }),
    }
}

#[async_trait]
impl DataFetcher for FirecrawlExtractor {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedData, FetchError> {
        tracing::info!(urls = request.urls.len(), "Starting Firecrawl extraction");

        let started = self.start(request).await?;
        let data = match interpret_extract_response(&started)? {
            ExtractStep::Done(data) => data,
            ExtractStep::Pending(job_id) if !job_id.is_empty() => {
                tracing::info!(job_id = %job_id, "Extraction queued, polling for results");
                self.wait_for(job_id).await?
            }
            ExtractStep::Pending(_) => {
                return Err(FetchError::InvalidResponse {
                    service: SERVICE,
                    message: "pending response without a job id".to_string(),
                })
            }
            ExtractStep::Failed(status) => {
                return Err(FetchError::JobFailed {
                    service: SERVICE,
                    job_id: String::new(),
                    status,
                })
            }
        };

        let records = locate_records(&data, request.schema.collection_key());
        tracing::info!(records = records.len(), "Firecrawl extraction completed");

        Ok(FetchedData {
            source: "firecrawl".to_string(),
            records,
            raw: data,
        })
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
