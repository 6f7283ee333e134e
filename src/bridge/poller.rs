//! Fixed-interval polling of a backend task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::backend::{TaskBackend, TaskStatus};
use crate::errors::BridgeError;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The task reached `Completed` or `Failed`
    Finished(TaskStatus),
    /// The stop flag was raised before the task finished
    Stopped,
}

#[derive(Debug, Clone)]
pub struct TaskPoller {
    interval: Duration,
    max_attempts: u32,
    stop: Arc<AtomicBool>,
}

impl TaskPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a stop flag with other pollers or a shutdown handler.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub async fn poll(
        &self,
        backend: &dyn TaskBackend,
        task_id: &str,
    ) -> Result<PollOutcome, BridgeError> {
        self.poll_with(backend, task_id, |_| {}).await
    }

    /// Poll until the task is terminal, calling `on_update` whenever the
    /// status message changes.
    pub async fn poll_with<F>(
        &self,
        backend: &dyn TaskBackend,
        task_id: &str,
        mut on_update: F,
    ) -> Result<PollOutcome, BridgeError>
    where
        F: FnMut(&TaskStatus) + Send,
    {
        let mut last_message: Option<String> = None;

        for attempt in 1..=self.max_attempts {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!(task = %task_id, attempt, "Polling stopped");
                return Ok(PollOutcome::Stopped);
            }

            let status = backend.status(task_id).await?;
            if status.message.is_some() && status.message != last_message {
                last_message = status.message.clone();
                on_update(&status);
            }
            if status.state.is_terminal() {
                tracing::debug!(task = %task_id, attempt, state = ?status.state, "Task finished");
                return Ok(PollOutcome::Finished(status));
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(BridgeError::PollTimeout {
            task_id: task_id.to_string(),
            waited: self.interval * self.max_attempts.saturating_sub(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::backend::TaskState;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed list of statuses, repeating the last one.
    struct Scripted {
        statuses: Mutex<Vec<TaskStatus>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(statuses: Vec<TaskStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskBackend for Scripted {
        async fn submit(&self, _session_id: &str, _message: &str) -> Result<String, BridgeError> {
            Ok("t-1".to_string())
        }

        async fn status(&self, _task_id: &str) -> Result<TaskStatus, BridgeError> {
            *self.calls.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses[0].clone())
            }
        }
    }

    #[tokio::test]
    async fn returns_terminal_status_and_reports_message_changes() {
        let backend = Scripted::new(vec![
            TaskStatus::new(TaskState::Pending).with_message("queued"),
            TaskStatus::new(TaskState::Processing).with_message("queued"),
            TaskStatus::new(TaskState::Processing).with_message("searching"),
            TaskStatus::new(TaskState::Completed).with_result(serde_json::json!("3 homes")),
        ]);
        let poller = TaskPoller::new(Duration::from_millis(1), 10);

        let mut seen = Vec::new();
        let outcome = poller
            .poll_with(&backend, "t-1", |s| seen.push(s.message.clone().unwrap_or_default()))
            .await
            .unwrap();

        match outcome {
            PollOutcome::Finished(status) => assert_eq!(status.state, TaskState::Completed),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(seen, vec!["queued", "searching"]);
        assert_eq!(*backend.calls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let backend = Scripted::new(vec![TaskStatus::new(TaskState::Processing)]);
        let poller = TaskPoller::new(Duration::from_millis(1), 3);
        let err = poller.poll(&backend, "t-1").await.unwrap_err();
        assert!(matches!(err, BridgeError::PollTimeout { ref task_id, .. } if task_id == "t-1"));
        assert_eq!(*backend.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn stop_flag_is_checked_before_each_poll() {
        let backend = Scripted::new(vec![TaskStatus::new(TaskState::Processing)]);
        let poller = TaskPoller::new(Duration::from_millis(1), 3);
        poller.stop_flag().store(true, Ordering::SeqCst);
        assert_eq!(poller.poll(&backend, "t-1").await.unwrap(), PollOutcome::Stopped);
        assert_eq!(*backend.calls.lock().unwrap(), 0);
    }
}
