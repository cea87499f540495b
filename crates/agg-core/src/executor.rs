//! Branch executor
//!
//! Runs one upstream lookup on the worker pool and turns its outcome into
//! either a value or an unclassified [`BranchFailure`]. Whether a failure is
//! fatal is decided later by the recovery policy.
//!
//! # Deadlines
//!
//! A deadline is measured from submission. When it elapses the executor
//! stops waiting and reports `FailureKind::Timeout`. A lookup that already
//! started keeps its worker until the blocking call returns; its result is
//! discarded. A lookup still queued behind a saturated pool is cancelled
//! and never runs. Dropping a [`BranchHandle`] cancels it the same way, so
//! an aborted aggregation leaves no queued lookups behind.

use crate::error::{BranchFailure, FailureKind, UpstreamError};
use crate::pool::WorkerPool;
use agg_model::BranchId;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

/// Submits lookups to the shared worker pool
#[derive(Debug, Clone)]
pub struct BranchExecutor {
    pool: Arc<WorkerPool>,
}

impl BranchExecutor {
    /// Create executor over a shared pool
    #[inline]
    #[must_use]
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }

    /// Start a branch without waiting for it
    ///
    /// The operation is invoked exactly once, on a pool worker. A closed pool
    /// yields a handle that resolves to `FailureKind::Rejected`.
    pub fn spawn<T, F>(&self, branch: BranchId, deadline: Option<Duration>, op: F) -> BranchHandle<T>
    where
        F: FnOnce() -> Result<T, UpstreamError> + Send + 'static,
        T: Send + 'static,
    {
        tracing::debug!(%branch, ?deadline, "branch started");

        let started = Instant::now();
        let join = self.pool.run_blocking(op).ok();

        BranchHandle {
            branch,
            started,
            deadline,
            join,
            pool: Arc::clone(&self.pool),
        }
    }

    /// Run a branch to completion
    ///
    /// # Errors
    /// - `BranchFailure` wrapping the upstream error, timeout, panic,
    ///   cancellation or rejection
    pub async fn run<T, F>(
        &self,
        branch: BranchId,
        op: F,
        deadline: Option<Duration>,
    ) -> Result<T, BranchFailure>
    where
        F: FnOnce() -> Result<T, UpstreamError> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(branch, deadline, op).outcome().await
    }
}

/// A branch in flight
#[derive(Debug)]
pub struct BranchHandle<T> {
    branch: BranchId,
    started: Instant,
    deadline: Option<Duration>,
    join: Option<JoinHandle<Result<T, UpstreamError>>>,
    pool: Arc<WorkerPool>,
}

impl<T> BranchHandle<T> {
    /// Branch identity
    #[inline]
    #[must_use]
    pub fn branch(&self) -> BranchId {
        self.branch
    }

    /// Stop the branch if it has not started yet; otherwise detach it
    pub fn abort(&self) {
        if let Some(join) = &self.join {
            join.abort();
            tracing::debug!(branch = %self.branch, "branch aborted");
        }
    }

    /// Wait for the value or the failure
    ///
    /// # Errors
    /// - `BranchFailure` as described on [`BranchExecutor::run`]
    pub async fn outcome(mut self) -> Result<T, BranchFailure> {
        let result = self.wait().await;
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(value) => {
                tracing::debug!(branch = %self.branch, elapsed_ms, "branch finished");
                Ok(value)
            }
            Err(kind) => {
                tracing::warn!(branch = %self.branch, kind = %kind, elapsed_ms, "branch failed");
                self.pool.record_failure(&kind);
                Err(BranchFailure::new(self.branch, kind))
            }
        }
    }

    async fn wait(&mut self) -> Result<T, FailureKind> {
        let Some(join) = self.join.as_mut() else {
            return Err(FailureKind::Rejected);
        };

        let joined = match self.deadline {
            Some(limit) => match tokio::time::timeout_at(self.started + limit, &mut *join).await {
                Ok(joined) => joined,
                Err(_) => {
                    // no-op if the lookup already started on a worker
                    join.abort();
                    return Err(FailureKind::Timeout { after: limit });
                }
            },
            None => join.await,
        };

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(upstream)) => Err(FailureKind::Upstream(upstream)),
            Err(err) => Err(join_failure(err)),
        }
    }
}

impl<T> Drop for BranchHandle<T> {
    // a dropped branch is never awaited, so a still-queued lookup must not start
    fn drop(&mut self) {
        if let Some(join) = &self.join {
            join.abort();
        }
    }
}

fn join_failure(err: JoinError) -> FailureKind {
    if err.is_cancelled() {
        return FailureKind::Cancelled;
    }
    match err.try_into_panic() {
        Ok(payload) => FailureKind::Panicked(panic_message(payload.as_ref())),
        Err(_) => FailureKind::Cancelled,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant as StdInstant;

    fn executor(workers: usize) -> BranchExecutor {
        let config = AggregatorConfig::new().with_worker_threads(workers);
        BranchExecutor::new(Arc::new(WorkerPool::start(&config).unwrap()))
    }

    #[tokio::test]
    async fn returns_value_on_success() {
        let exec = executor(2);
        let value = exec.run(BranchId::Review, || Ok(7_u32), None).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn wraps_upstream_error_as_recoverable_failure() {
        let exec = executor(2);
        let failure = exec
            .run::<u32, _>(BranchId::Review, || Err(UpstreamError::new("down")), None)
            .await
            .unwrap_err();

        assert_eq!(failure.branch, BranchId::Review);
        assert_eq!(failure.kind, FailureKind::Upstream(UpstreamError::new("down")));
        assert!(!failure.fatal);
    }

    #[tokio::test]
    async fn deadline_stops_waiting_on_slow_lookup() {
        let exec = executor(2);
        let started = StdInstant::now();

        let failure = exec
            .run(
                BranchId::Info,
                || {
                    std::thread::sleep(Duration::from_millis(500));
                    Ok(())
                },
                Some(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        assert!(failure.is_timeout());
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn lookup_finishing_within_deadline_succeeds() {
        let exec = executor(2);
        let value = exec
            .run(BranchId::Info, || Ok("fast"), Some(Duration::from_secs(5)))
            .await;
        assert_eq!(value.unwrap(), "fast");
    }

    #[tokio::test]
    async fn panic_is_reported_as_failure() {
        let exec = executor(1);
        let failure = exec
            .run::<u32, _>(BranchId::Review, || panic!("bad payload"), None)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Panicked("bad payload".into()));
    }

    #[tokio::test]
    async fn closed_pool_rejects_branch() {
        let config = AggregatorConfig::new().with_worker_threads(1);
        let pool = Arc::new(WorkerPool::start(&config).unwrap());
        pool.shutdown();

        let failure = BranchExecutor::new(pool)
            .run(BranchId::Review, || Ok(()), None)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Rejected);
    }

    #[tokio::test]
    async fn operation_runs_exactly_once() {
        let exec = executor(2);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        exec.run(
            BranchId::Review,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queued_branch_is_cancelled_by_abort() {
        // one worker, kept busy so the second branch stays queued
        let exec = executor(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let busy = exec.spawn(BranchId::Info, None, || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        let flag = Arc::clone(&ran);
        let queued = exec.spawn(BranchId::Review, None, move || {
            flag.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        queued.abort();
        let failure = queued.outcome().await.unwrap_err();
        busy.outcome().await.unwrap();

        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropped_handle_cancels_queued_branch() {
        let exec = executor(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let busy = exec.spawn(BranchId::Info, None, || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        let flag = Arc::clone(&ran);
        drop(exec.spawn(BranchId::Review, None, move || {
            flag.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        busy.outcome().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
