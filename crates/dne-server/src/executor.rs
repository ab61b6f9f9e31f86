//! Single-slot run executor
//!
//! One dedicated worker task drains a capacity-1 channel, so at most one
//! synchronization executes at any moment by construction. Requests are
//! additionally gated through [`RunTracker::begin`], which is the atomic
//! check-and-start: a request while a run is in flight gets
//! [`StartOutcome::AlreadyRunning`] and never touches the channel, the
//! staging table, or anything else.
//!
//! There is no cancellation path; once started, a run always reaches a
//! terminal state and the tracker is released.

use std::future::Future;
use std::sync::Arc;

use dne_ingest::{Result as SyncResult, SyncOutcome};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::state::{RunTracker, StatusSnapshot};

/// Result of a start-run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Handle for triggering background synchronization runs.
pub struct RunExecutor {
    tracker: Arc<RunTracker>,
    tx: mpsc::Sender<()>,
}

impl RunExecutor {
    /// Spawn the worker task. `job` executes one full synchronization and
    /// is invoked once per accepted request, strictly sequentially.
    pub fn spawn<F, Fut>(tracker: Arc<RunTracker>, job: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = SyncResult<SyncOutcome>> + Send,
    {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let worker_tracker = Arc::clone(&tracker);

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                info!("Synchronization run started");
                match job().await {
                    Ok(outcome) => {
                        info!(
                            records = outcome.records_decoded,
                            staged = outcome.rows_staged,
                            inserted = outcome.inserted,
                            deleted = outcome.deleted,
                            "Synchronization run succeeded"
                        );
                        worker_tracker.succeed();
                    },
                    Err(err) => {
                        error!(error = ?err, "Synchronization run failed");
                        worker_tracker.fail(err.to_string());
                    },
                }
            }
        });

        Self { tracker, tx }
    }

    /// Request a run. Atomic with respect to concurrent requests: exactly
    /// one caller observes `Started` per idle period.
    pub fn try_start(&self) -> StartOutcome {
        if !self.tracker.begin() {
            return StartOutcome::AlreadyRunning;
        }

        match self.tx.try_send(()) {
            Ok(()) => StartOutcome::Started,
            Err(_) => {
                // Only reachable when the worker task is gone (shutdown);
                // release the tracker so status is not stuck on running.
                self.tracker.fail("run executor is not available".to_string());
                StartOutcome::AlreadyRunning
            },
        }
    }

    /// Current run status.
    pub fn status(&self) -> StatusSnapshot {
        self.tracker.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunResult;
    use std::time::Duration;

    async fn slow_success() -> SyncResult<SyncOutcome> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(SyncOutcome {
            records_decoded: 1,
            rows_staged: 1,
            inserted: 1,
            deleted: 0,
        })
    }

    async fn always_fails() -> SyncResult<SyncOutcome> {
        Err(dne_ingest::SyncError::Archive("no nested archive".to_string()))
    }

    async fn wait_until_idle(executor: &RunExecutor) {
        for _ in 0..100 {
            if !executor.status().running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run never finished");
    }

    #[tokio::test]
    async fn second_request_while_running_is_rejected() {
        let tracker = Arc::new(RunTracker::new());
        let executor = RunExecutor::spawn(tracker, slow_success);

        assert_eq!(executor.try_start(), StartOutcome::Started);
        assert_eq!(executor.try_start(), StartOutcome::AlreadyRunning);

        wait_until_idle(&executor).await;
        let status = executor.status();
        assert_eq!(status.last_result, Some(RunResult::Success));
    }

    #[tokio::test]
    async fn executor_accepts_new_run_after_completion() {
        let tracker = Arc::new(RunTracker::new());
        let executor = RunExecutor::spawn(tracker, slow_success);

        assert_eq!(executor.try_start(), StartOutcome::Started);
        wait_until_idle(&executor).await;
        assert_eq!(executor.try_start(), StartOutcome::Started);
        wait_until_idle(&executor).await;
    }

    #[tokio::test]
    async fn failed_run_reports_error_message() {
        let tracker = Arc::new(RunTracker::new());
        let executor = RunExecutor::spawn(tracker, always_fails);

        assert_eq!(executor.try_start(), StartOutcome::Started);
        wait_until_idle(&executor).await;

        let status = executor.status();
        assert_eq!(status.last_result, Some(RunResult::Failed));
        assert_eq!(
            status.last_error.as_deref(),
            Some("Archive error: no nested archive")
        );
    }
}
