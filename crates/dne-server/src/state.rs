//! Run status state machine
//!
//! One synchronization run at a time: `Idle -> Running -> {Succeeded,
//! Failed} -> Idle`. [`RunTracker`] owns the process-wide status and its
//! transition methods are the only mutation points. The mutex is held only
//! for the duration of each read or write, never across a run, so status
//! queries stay responsive during a long synchronization.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Terminal result of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResult {
    Success,
    Failed,
}

/// Point-in-time view of the run status, as reported by `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_result: Option<RunResult>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct StatusInner {
    running: bool,
    last_run: Option<DateTime<Utc>>,
    last_result: Option<RunResult>,
    last_error: Option<String>,
}

/// Thread-safe tracker for the one-run-at-a-time state machine.
#[derive(Default)]
pub struct RunTracker {
    inner: Mutex<StatusInner>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Idle -> Running`. Atomic check-and-start: returns `false` without
    /// any transition when a run is already in flight.
    pub fn begin(&self) -> bool {
        let mut inner = self.lock();
        if inner.running {
            return false;
        }
        inner.running = true;
        inner.last_run = Some(Utc::now());
        inner.last_result = None;
        inner.last_error = None;
        true
    }

    /// `Running -> Succeeded -> Idle`.
    pub fn succeed(&self) {
        let mut inner = self.lock();
        inner.running = false;
        inner.last_result = Some(RunResult::Success);
        inner.last_error = None;
    }

    /// `Running -> Failed -> Idle`. The message persists until the next run.
    pub fn fail(&self, message: String) {
        let mut inner = self.lock();
        inner.running = false;
        inner.last_result = Some(RunResult::Failed);
        inner.last_error = Some(message);
    }

    /// Readable at any time, including while a run executes.
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock();
        StatusSnapshot {
            running: inner.running,
            last_run: inner.last_run,
            last_result: inner.last_result,
            last_error: inner.last_error.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatusInner> {
        // A panic while holding this lock poisons only bookkeeping state;
        // carry on with the inner value.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
