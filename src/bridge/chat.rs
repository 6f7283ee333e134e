//! Chat side of the bridge: where replies go, and the handler tying it together.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::backend::{TaskBackend, TaskState};
use super::poller::{PollOutcome, TaskPoller};
use super::store::SessionStore;
use crate::errors::BridgeError;

const SLACK_API_URL: &str = "https://slack.com/api";

/// Somewhere to post threaded replies.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post(&self, channel: &str, thread_ts: &str, text: &str) -> Result<(), BridgeError>;
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts with the Slack Web API `chat.postMessage` method.
pub struct SlackSink {
    http: Client,
    token: String,
    base_url: String,
}

impl SlackSink {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Chat(e.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: SLACK_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ChatSink for SlackSink {
    async fn post(&self, channel: &str, thread_ts: &str, text: &str) -> Result<(), BridgeError> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "channel": channel,
                "thread_ts": thread_ts,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| BridgeError::Chat(e.to_string()))?;

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Chat(e.to_string()))?;
        if !body.ok {
            return Err(BridgeError::Chat(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(())
    }
}

/// An incoming chat message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatEvent {
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    pub text: String,
}

impl ChatEvent {
    /// Thread the reply belongs in; a top-level message starts its own.
    pub fn thread(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<@[A-Z0-9]+>").expect("mention pattern is valid"))
}

/// Remove `<@U123>` user mentions and surrounding whitespace.
pub fn strip_mentions(text: &str) -> String {
    mention_pattern().replace_all(text, "").trim().to_string()
}

/// Counts from one [`ChatBridge::serve`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServeSummary {
    pub handled: usize,
    pub failed: usize,
    pub malformed: usize,
}

/// Forwards chat messages to a task backend and answers in the thread.
///
/// At most `max_workers` messages are handled at the same time.
pub struct ChatBridge {
    store: Arc<SessionStore>,
    backend: Arc<dyn TaskBackend>,
    sink: Arc<dyn ChatSink>,
    poller: TaskPoller,
    permits: Arc<Semaphore>,
}

impl ChatBridge {
    pub fn new(
        store: Arc<SessionStore>,
        backend: Arc<dyn TaskBackend>,
        sink: Arc<dyn ChatSink>,
        poller: TaskPoller,
        max_workers: usize,
    ) -> Self {
        Self {
            store,
            backend,
            sink,
            poller,
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Handle one message end to end. Failures are reported in the thread
    /// and then returned.
    pub async fn handle(&self, event: &ChatEvent) -> Result<(), BridgeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BridgeError::Chat("bridge is shutting down".to_string()))?;

        match self.process(event).await {
            Ok(Some(reply)) => self.sink.post(&event.channel, event.thread(), &reply).await,
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!(thread = %event.thread(), error = %err, "Message handling failed");
                let notice = format!("An error occurred: {}", err);
                if let Err(post_err) = self.sink.post(&event.channel, event.thread(), &notice).await {
                    tracing::warn!(error = %post_err, "Could not report failure to chat");
                }
                Err(err)
            }
        }
    }

    /// Handle newline-delimited [`ChatEvent`] JSON until `reader` ends.
    ///
    /// Every event runs on its own task; the worker permits bound how many
    /// are in flight. Blank lines are skipped, undecodable ones counted.
    pub async fn serve<R>(self: Arc<Self>, reader: R) -> Result<ServeSummary, BridgeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = ServeSummary::default();
        let mut tasks = JoinSet::new();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event: ChatEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping malformed chat event");
                    summary.malformed += 1;
                    continue;
                }
            };
            let bridge = self.clone();
            tasks.spawn(async move { bridge.handle(&event).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => summary.handled += 1,
                Ok(Err(_)) => summary.failed += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "Chat handler task panicked");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            handled = summary.handled,
            failed = summary.failed,
            malformed = summary.malformed,
            "Chat event stream finished"
        );
        Ok(summary)
    }

    /// Reply text, or `None` when polling was stopped.
    async fn process(&self, event: &ChatEvent) -> Result<Option<String>, BridgeError> {
        let thread = event.thread();
        let session_id = self
            .store
            .get_or_create_session(thread, || format!("{}-{}", event.channel, thread))?;

        let message = strip_mentions(&event.text);
        let task_id = self.backend.submit(&session_id, &message).await?;

        let outcome = self
            .poller
            .poll_with(self.backend.as_ref(), &task_id, |status| {
                tracing::info!(task = %task_id, message = ?status.message, "Task progress");
            })
            .await?;

        let status = match outcome {
            PollOutcome::Finished(status) => status,
            PollOutcome::Stopped => return Ok(None),
        };

        self.store.save_state(
            &session_id,
            &json!({ "last_task": task_id, "last_state": status.state }),
        )?;

        match status.state {
            TaskState::Failed => Err(BridgeError::TaskFailed {
                task_id,
                message: status.message.unwrap_or_else(|| "no details".to_string()),
            }),
            _ => Ok(Some(
                status
                    .result_text()
                    .or(status.message)
                    .unwrap_or_else(|| "Done.".to_string()),
            )),
        }
    }
}
