// src/progress.rs

//! Progress reporting for recipe execution
//!
//! The [`Kitchen`](crate::Kitchen) reports every stage it enters and leaves,
//! and the final outcome, to a [`ProgressTracker`]. Implementations:
//! - `SilentProgress`: counts stages, reports nothing
//! - `LogProgress`: logs stage transitions to tracing
//! - `CallbackProgress`: forwards [`ProgressEvent`]s to a closure
//!
//! # Example
//!
//! ```ignore
//! use conary_kitchen::progress::{CallbackProgress, ProgressEvent};
//!
//! let progress = CallbackProgress::new(|event| {
//!     if let ProgressEvent::StageStarted(stage) = event {
//!         println!("-> {stage}");
//!     }
//! });
//! let kitchen = Kitchen::new(config)?.with_progress(Arc::new(progress));
//! ```

use crate::recipe::kitchen::Stage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{error, info};

/// Core trait for progress tracking
///
/// Implementations must be thread-safe: one tracker may observe several
/// concurrent executions.
pub trait ProgressTracker: Send + Sync {
    /// A stage is about to run
    fn stage_started(&self, stage: Stage);

    /// A stage finished successfully
    fn stage_completed(&self, stage: Stage);

    /// Free-form status message
    fn set_message(&self, message: &str);

    /// Number of stages completed so far
    fn position(&self) -> u64;

    /// The execution reached `Done`
    fn finish_with_message(&self, message: &str);

    /// The execution failed or was cancelled
    fn finish_with_error(&self, message: &str);

    fn is_finished(&self) -> bool;
}

/// Silent progress tracker (no-op)
#[derive(Debug, Default)]
pub struct SilentProgress {
    completed: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}

    fn stage_completed(&self, _stage: Stage) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn set_message(&self, _message: &str) {}

    fn position(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Logs stage transitions at info level, prefixed with a name (usually the
/// package being cooked).
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    completed: AtomicU64,
    finished: AtomicBool,
}

impl LogProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn stage_started(&self, stage: Stage) {
        info!("{}: entering {}", self.name, stage);
    }

    fn stage_completed(&self, stage: Stage) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "{}: {} complete ({}/{})",
            self.name,
            stage,
            done,
            Stage::PIPELINE.len()
        );
    }

    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn position(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        error!("{}: {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Events emitted by [`CallbackProgress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StageStarted(Stage),
    StageCompleted(Stage),
    /// Message updated
    Message(String),
    /// Execution finished successfully
    Finished(String),
    /// Execution finished with an error
    Error(String),
}

/// Callback-based progress tracker
///
/// Calls a user-provided function for every event. Useful for hosts with their
/// own UI, and for tests that need to see which stages ran.
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
    completed: AtomicU64,
    finished: AtomicBool,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            completed: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn stage_started(&self, stage: Stage) {
        (self.callback)(ProgressEvent::StageStarted(stage));
    }

    fn stage_completed(&self, stage: Stage) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        (self.callback)(ProgressEvent::StageCompleted(stage));
    }

    fn set_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Message(message.to_string()));
    }

    fn position(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Finished(message.to_string()));
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Error(message.to_string()));
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}
