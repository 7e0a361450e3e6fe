// src/progress.rs

//! Job status reporting seam
//!
//! Installation plans run inside an external job framework. The engine
//! only ever writes to the job's status: progress messages and the log
//! lines required by the "no error is silently discarded" policy. The
//! [`JobStatus`] trait is that write-only seam; [`SilentStatus`] is the
//! no-op used when no job is attached.

use std::sync::Mutex;

/// Write-only view of the owning job's status
///
/// Implementations must be thread-safe: cleanup and propagation may
/// report from whichever thread the job framework or event bus uses.
pub trait JobStatus: Send + Sync {
    /// Record a log line attributed to the owning job
    fn log(&self, message: &str);

    /// Update the job's current progress message
    fn set_message(&self, message: &str);
}

/// No-op status for unattended runs without an owning job
#[derive(Debug, Default)]
pub struct SilentStatus;

impl JobStatus for SilentStatus {
    fn log(&self, _message: &str) {}

    fn set_message(&self, _message: &str) {}
}

/// Status sink that collects every line, for tests and diagnostics
#[derive(Debug, Default)]
pub struct CollectingStatus {
    lines: Mutex<Vec<String>>,
}

impl CollectingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines logged so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl JobStatus for CollectingStatus {
    fn log(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn set_message(&self, message: &str) {
        self.log(message);
    }
}
