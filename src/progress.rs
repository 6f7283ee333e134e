//! Progress callbacks invoked around each pipeline stage.
//!
//! Reporters only observe; they cannot cancel or slow down a run.

use std::time::Duration;

/// Something that wants to hear about stage boundaries.
pub trait ProgressReporter: Send + Sync {
    fn on_stage_start(&self, index: usize, total: usize, stage: &str);

    fn on_stage_complete(&self, index: usize, total: usize, stage: &str, elapsed: Duration);

    fn on_stage_failed(&self, _index: usize, _total: usize, _stage: &str, _error: &str) {}
}

/// Share of work done, clamped to `[0, 1]`. An empty run counts as done.
pub fn fraction(done: usize, total: usize) -> f32 {
    if total == 0 {
        return 1.0;
    }
    (done.min(total) as f32) / (total as f32)
}

/// A single progress notification, as handed to [`FnReporter`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started {
        index: usize,
        total: usize,
        stage: String,
    },
    Completed {
        index: usize,
        total: usize,
        stage: String,
        elapsed: Duration,
    },
    Failed {
        index: usize,
        total: usize,
        stage: String,
        error: String,
    },
}

impl ProgressEvent {
    /// Human-readable status line, e.g. `"[2/3] market_analysis done"`.
    pub fn describe(&self) -> String {
        match self {
            ProgressEvent::Started { index, total, stage } => {
                format!("[{}/{}] {} running...", index + 1, total, stage)
            }
            ProgressEvent::Completed {
                index,
                total,
                stage,
                elapsed,
            } => format!(
                "[{}/{}] {} done in {:.1}s",
                index + 1,
                total,
                stage,
                elapsed.as_secs_f32()
            ),
            ProgressEvent::Failed {
                index,
                total,
                stage,
                error,
            } => format!("[{}/{}] {} failed: {}", index + 1, total, stage, error),
        }
    }
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_stage_start(&self, _index: usize, _total: usize, _stage: &str) {}

    fn on_stage_complete(&self, _index: usize, _total: usize, _stage: &str, _elapsed: Duration) {}
}

/// Reporter that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_stage_start(&self, index: usize, total: usize, stage: &str) {
        tracing::info!(stage, step = index + 1, total, "Stage started");
    }

    fn on_stage_complete(&self, index: usize, total: usize, stage: &str, elapsed: Duration) {
        tracing::info!(
            stage,
            step = index + 1,
            total,
            elapsed_ms = elapsed.as_millis() as u64,
            progress = fraction(index + 1, total),
            "Stage completed"
        );
    }

    fn on_stage_failed(&self, index: usize, total: usize, stage: &str, error: &str) {
        tracing::warn!(stage, step = index + 1, total, error, "Stage failed");
    }
}

/// Reporter that forwards events to a closure.
///
/// # Example
/// ```rust
/// use llmpipeline::progress::{FnReporter, ProgressReporter};
///
/// let reporter = FnReporter::new(|event| println!("{}", event.describe()));
/// reporter.on_stage_start(0, 2, "search");
/// ```
pub struct FnReporter<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
}

impl<F> FnReporter<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for FnReporter<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_stage_start(&self, index: usize, total: usize, stage: &str) {
        (self.callback)(ProgressEvent::Started {
            index,
            total,
            stage: stage.to_string(),
        });
    }

    fn on_stage_complete(&self, index: usize, total: usize, stage: &str, elapsed: Duration) {
        (self.callback)(ProgressEvent::Completed {
            index,
            total,
            stage: stage.to_string(),
            elapsed,
        });
    }

    fn on_stage_failed(&self, index: usize, total: usize, stage: &str, error: &str) {
        (self.callback)(ProgressEvent::Failed {
            index,
            total,
            stage: stage.to_string(),
            error: error.to_string(),
        });
    }
}
