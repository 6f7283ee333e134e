//! LLM API integration module for generating responses.
//!
//! [`ChatClient`] talks to any [`Provider`]: the OpenAI-compatible ones share
//! one request path, Anthropic gets its own. Pipeline stages only see the
//! [`ChatModel`] trait, so tests can swap in scripted models.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::provider::{Provider, WireFormat};
use crate::config::Config;
use crate::errors::{ApiError, PipelineResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// A single message in a chat conversation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    /// The role of the message sender ("system", "user", "assistant")
    pub role: String,
    /// The text content of the message
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// One prompt sent to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
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

    fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(self.prompt.clone()));
        messages
    }
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, ApiError>;

    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletion<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct APIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// HTTP client for a hosted chat model.
///
/// # Example
/// ```rust,ignore
/// use llmpipeline::generate::{ChatClient, ChatModel, ChatRequest, Provider};
/// use std::time::Duration;
///
/// let client = ChatClient::new(Provider::OpenAi, api_key, "gpt-4o-mini", Duration::from_secs(60))?;
/// let text = client.complete(ChatRequest::new("Say hi")).await?;
/// ```
pub struct ChatClient {
    http: Client,
    provider: Provider,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        provider: Provider,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            provider,
            endpoint: provider.default_base_url().to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build the client described by `LLM_PROVIDER`, `LLM_MODEL` and friends.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        let api_key = config.api_key_for(config.provider)?;
        let client = Self::new(config.provider, api_key, &config.model, config.http_timeout)?
            .with_endpoint(&config.base_url);
        Ok(client)
    }

    /// Override the full chat endpoint URL (proxies, local gateways).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn send_openai(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let body = ChatCompletion {
            model: &self.model,
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let text = check_status(response).await?.text().await?;
        parse_chat_completion(&text)
    }

    async fn send_anthropic(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let body = AnthropicRequest {
            model: &self.model,
            system: request.system.as_deref(),
            messages: vec![Message::user(request.prompt.clone())],
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let text = check_status(response).await?.text().await?;
        parse_anthropic_message(&text)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ApiError> {
        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "Sending chat request"
        );
        match self.provider.wire_format() {
            WireFormat::OpenAiChat => self.send_openai(&request).await,
            WireFormat::AnthropicMessages => self.send_anthropic(&request).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Map a non-success HTTP status onto an [`ApiError`].
///
/// `ApiError::Timeout` is reserved for client-side timeouts; a 408 or 504
/// from the server is a failed request like any other status.
pub(crate) fn status_error(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::AuthenticationFailed,
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimitExceeded,
        _ => ApiError::RequestFailed(format!("{}: {}", status, body.trim())),
    }
}

/// Pull the first choice's content out of an OpenAI-style response body.
pub(crate) fn parse_chat_completion(body: &str) -> Result<String, ApiError> {
    let res: APIResponse =
        serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    let choice = res
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::InvalidResponse("response has no choices".to_string()))?;

    // A choice without content (e.g. a refusal) yields an empty string
    Ok(choice.message.content.unwrap_or_default())
}

/// Join the text blocks of an Anthropic Messages response.
pub(crate) fn parse_anthropic_message(body: &str) -> Result<String, ApiError> {
    let res: AnthropicResponse =
        serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    Ok(res
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join(""))
}

/// Generate a text response from an OpenAI-compatible endpoint.
///
/// Convenience wrapper for one-off calls; pipelines should hold a
/// [`ChatClient`] so the connection pool is reused.
///
/// # Example
/// ```rust,ignore
/// # use llmpipeline::generate::{generate, Message};
/// let response = generate(
///     "https://openrouter.ai/api/v1/chat/completions".to_string(),
///     api_key,
///     "openai/gpt-4o-mini".to_string(),
///     0.7,
///     vec![Message::user("Hello")],
/// ).await?;
/// ```
pub async fn generate(
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    messages: Vec<Message>,
) -> Result<String, ApiError> {
    let client = Client::new();
    let body = ChatCompletion {
        model: &model,
        messages,
        temperature,
        max_tokens: None,
    };

    let response = client
        .post(base_url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?;

    let text = check_status(response).await?.text().await?;
    parse_chat_completion(&text)
}
