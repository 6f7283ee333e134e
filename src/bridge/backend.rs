//! The task backend the bridge forwards chat messages to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(alias = "status")]
    pub state: TaskState,
    /// Human-readable progress note
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            result: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Result as chat text: strings verbatim, anything else as pretty JSON.
    pub fn result_text(&self) -> Option<String> {
        match self.result.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
        }
    }
}

/// A service that runs long tasks for a session.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Start a task; returns its id.
    async fn submit(&self, session_id: &str, message: &str) -> Result<String, BridgeError>;

    async fn status(&self, task_id: &str) -> Result<TaskStatus, BridgeError>;
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(alias = "id")]
    task_id: String,
}

/// JSON-over-HTTP backend: `POST {base}/api/tasks`, `GET {base}/api/tasks/{id}`.
pub struct HttpTaskBackend {
    http: Client,
    base_url: String,
}

impl HttpTaskBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Backend(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BridgeError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BridgeError::Backend(e.to_string()))?;
        if !status.is_success() {
            return Err(BridgeError::Backend(format!("{} - {}", status, text.trim())));
        }
        serde_json::from_str(&text).map_err(|e| BridgeError::Backend(format!("invalid response: {}", e)))
    }
}

#[async_trait]
impl TaskBackend for HttpTaskBackend {
    async fn submit(&self, session_id: &str, message: &str) -> Result<String, BridgeError> {
        let response = self
            .http
            .post(format!("{}/api/tasks", self.base_url))
            .json(&SubmitRequest { session_id, message })
            .send()
            .await
            .map_err(|e| BridgeError::Backend(e.to_string()))?;
        let submitted: SubmitResponse = Self::read_json(response).await?;
        tracing::info!(session = %session_id, task = %submitted.task_id, "Task submitted");
        Ok(submitted.task_id)
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatus, BridgeError> {
        let response = self
            .http
            .get(format!("{}/api/tasks/{}", self.base_url, task_id))
            .send()
            .await
            .map_err(|e| BridgeError::Backend(e.to_string()))?;
        Self::read_json(response).await
    }
}
