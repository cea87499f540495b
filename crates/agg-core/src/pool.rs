//! Worker pool for branch lookups
//!
//! Owns a dedicated tokio runtime:
//! - Coordinator threads drive the aggregation orchestrators
//! - The blocking pool, capped at the worker bound, runs upstream lookups
//! - Lookups beyond the bound queue until a worker frees up
//!
//! # Lifecycle
//!
//! Create once at startup with [`WorkerPool::start`], share it by `Arc`
//! between aggregators, and release it with [`WorkerPool::shutdown`]. After
//! shutdown every submission is rejected. Dropping the pool without an
//! explicit shutdown releases it in the background without draining.

use crate::config::AggregatorConfig;
use crate::error::{FailureKind, PoolError};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Lookups accepted by the pool
    pub submitted: u64,
    /// Lookups whose operation returned (or panicked)
    pub finished: u64,
    /// Lookups still running or queued, including ones whose branch timed out
    pub in_flight: u64,
    /// Branches that failed for any reason
    pub failed: u64,
    /// Branches that failed because their deadline elapsed
    pub timed_out: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    finished: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

/// Counts a lookup as finished even if it unwinds
struct FinishGuard(Arc<Counters>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.finished.fetch_add(1, Ordering::Relaxed);
    }
}

/// Bounded pool shared by concurrent aggregations
#[derive(Debug)]
pub struct WorkerPool {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    workers: usize,
    grace: Duration,
    closed: AtomicBool,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Start the pool described by `config`
    ///
    /// # Errors
    /// - `PoolError::Config` if the configuration does not validate
    /// - `PoolError::Startup` if the runtime threads cannot be created
    pub fn start(config: &AggregatorConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let workers = config.effective_workers();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.coordinator_threads)
            .max_blocking_threads(workers)
            .thread_name("agg-pool")
            .enable_all()
            .build()?;

        tracing::info!(
            workers,
            coordinators = config.coordinator_threads,
            "worker pool started"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            workers,
            grace: config.shutdown_grace(),
            closed: AtomicBool::new(false),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Submit a blocking lookup
    ///
    /// # Errors
    /// - `PoolError::Closed` after shutdown
    pub fn run_blocking<T, F>(&self, op: F) -> Result<JoinHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let guard = FinishGuard(Arc::clone(&self.counters));

        Ok(self.handle.spawn_blocking(move || {
            let _guard = guard;
            op()
        }))
    }

    /// Submit a coordinating task
    ///
    /// # Errors
    /// - `PoolError::Closed` after shutdown
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, PoolError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        Ok(self.handle.spawn(future))
    }

    /// Worker bound
    #[inline]
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Drain window used by [`WorkerPool::shutdown`]
    #[inline]
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        self.grace
    }

    /// Check if the pool rejects new work
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Record a branch failure against the pool counters
    pub(crate) fn record_failure(&self, kind: &FailureKind) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        if matches!(kind, FailureKind::Timeout { .. }) {
            self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get pool statistics
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let submitted = self.counters.submitted.load(Ordering::Relaxed);
        let finished = self.counters.finished.load(Ordering::Relaxed);
        PoolStats {
            submitted,
            finished,
            in_flight: submitted.saturating_sub(finished),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work, draining for the configured grace
    pub fn shutdown(&self) {
        self.shutdown_timeout(self.grace);
    }

    /// Stop accepting work and release the runtime
    ///
    /// From synchronous code this waits up to `grace` for running lookups.
    /// From inside an async context waiting is not allowed, so the runtime
    /// is released in the background instead. Idempotent.
    pub fn shutdown_timeout(&self, grace: Duration) {
        self.closed.store(true, Ordering::Release);
        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };

        let stats = self.stats();
        if Handle::try_current().is_ok() {
            tracing::warn!(
                in_flight = stats.in_flight,
                "shutdown from async context; releasing worker pool in background"
            );
            runtime.shutdown_background();
        } else {
            tracing::info!(
                in_flight = stats.in_flight,
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "draining worker pool"
            );
            runtime.shutdown_timeout(grace);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}
