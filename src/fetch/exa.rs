//! Exa neural search fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::ExtractedRecord;
use super::{DataFetcher, FetchRequest, FetchedData};
use crate::errors::FetchError;

const EXA_API_URL: &str = "https://api.exa.ai";
const SERVICE: &str = "Exa";

/// Fields of every search-result record, heading first.
pub const SEARCH_RESULT_FIELDS: &[&str] = &["title", "url", "publishedDate", "text"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'static str,
    contents: Contents,
}

#[derive(Serialize)]
struct Contents {
    text: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    title: Option<String>,
    url: String,
    published_date: Option<String>,
    text: Option<String>,
}

impl From<SearchResult> for ExtractedRecord {
    fn from(result: SearchResult) -> Self {
        let mut map = Map::new();
        map.insert("url".to_string(), Value::String(result.url));
        let optional = [
            ("title", result.title),
            ("publishedDate", result.published_date),
            ("text", result.text),
        ];
        for (key, value) in optional {
            map.insert(key.to_string(), value.map(Value::String).unwrap_or(Value::Null));
        }
        ExtractedRecord(map)
    }
}

/// Search fetcher: runs [`FetchRequest::search_query`], URLs are ignored.
pub struct ExaSearcher {
    client: Client,
    api_key: String,
    base_url: String,
    num_results: u32,
}

impl ExaSearcher {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: EXA_API_URL.to_string(),
            num_results: 10,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results.max(1);
        self
    }
}

pub(crate) fn parse_search_response(body: &str) -> Result<(Vec<ExtractedRecord>, Value), FetchError> {
    let invalid = |e: serde_json::Error| FetchError::InvalidResponse {
        service: SERVICE,
        message: e.to_string(),
    };
    let raw: Value = serde_json::from_str(body).map_err(invalid)?;
    let parsed: SearchResponse = serde_json::from_value(raw.clone()).map_err(invalid)?;
    let records = parsed.results.into_iter().map(ExtractedRecord::from).collect();
    Ok((records, raw))
}

#[async_trait]
impl DataFetcher for ExaSearcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedData, FetchError> {
        let query = request.search_query();
        tracing::info!(query = %query, "Running Exa search");

        let body = SearchRequest {
            query,
            num_results: self.num_results,
            search_type: "auto",
            contents: Contents { text: true },
        };
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| FetchError::Http {
            service: SERVICE,
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(FetchError::Http {
                service: SERVICE,
                message: format!("{} - {}", status, text.trim()),
            });
        }

        let (records, raw) = parse_search_response(&text)?;
        Ok(FetchedData {
            source: "exa".to_string(),
            records,
            raw,
        })
    }

    fn name(&self) -> &str {
        "exa"
    }
}
