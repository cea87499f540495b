//! Aggregation orchestrator
//!
//! Assembles a [`Product`] from the three upstream lookups:
//!
//! 1. Start the info and review branches concurrently. The overall deadline
//!    bounds info; review is bounded only if configured to be.
//! 2. Await info. A fatal failure discards the review branch and ends the
//!    aggregation.
//! 3. Start one inventory branch per option and await the whole cohort.
//! 4. Attach each inventory (fetched or defaulted) to its option by position.
//! 5. Await review (fetched or defaulted).
//! 6. Assemble the composite.
//!
//! The pipeline always runs as a coordinating task on the worker pool. The
//! async, handle-based and blocking entry points differ only in how the
//! caller waits for it.

use crate::config::{AggregatorConfig, ReviewDeadline};
use crate::error::{AggregationError, BranchFailure, PoolError};
use crate::executor::{BranchExecutor, BranchHandle};
use crate::policy::{BranchValue, RecoveryOutcome, RecoveryPolicy};
use crate::pool::WorkerPool;
use crate::ports::UpstreamPorts;
use crate::types::AggregationId;
use agg_model::{BranchId, Product, ProductInfo};
use futures::future::join_all;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;

#[derive(Debug, Clone, Copy)]
struct Deadlines {
    info: Option<Duration>,
    review: ReviewDeadline,
    inventory: Option<Duration>,
}

/// Product detail aggregator
///
/// Cheap to clone; clones share the ports, pool and policy.
#[derive(Debug, Clone)]
pub struct Aggregator {
    ports: UpstreamPorts,
    pool: Arc<WorkerPool>,
    executor: BranchExecutor,
    policy: Arc<RecoveryPolicy>,
    deadlines: Deadlines,
}

impl Aggregator {
    /// Create aggregator over an existing pool with the standard policy
    #[must_use]
    pub fn new(ports: UpstreamPorts, pool: Arc<WorkerPool>, config: &AggregatorConfig) -> Self {
        Self {
            ports,
            executor: BranchExecutor::new(Arc::clone(&pool)),
            pool,
            policy: Arc::new(RecoveryPolicy::standard()),
            deadlines: Deadlines {
                info: config.info_timeout(),
                review: config.review_timeout,
                inventory: config.inventory_timeout(),
            },
        }
    }

    /// Start a dedicated pool and create an aggregator over it
    ///
    /// # Errors
    /// - `PoolError` if the pool cannot be started
    pub fn start(ports: UpstreamPorts, config: &AggregatorConfig) -> Result<Self, PoolError> {
        let pool = Arc::new(WorkerPool::start(config)?);
        Ok(Self::new(ports, pool, config))
    }

    /// Replace the recovery policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Recovery policy in use
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Shared worker pool
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Aggregate and wait asynchronously
    ///
    /// # Errors
    /// - `AggregationError::Fatal` if info (or any branch the policy treats
    ///   as fatal) fails
    /// - `AggregationError::PoolClosed` after pool shutdown
    pub async fn aggregate(&self, product_id: impl Into<String>) -> Result<Product, AggregationError> {
        self.submit(product_id).await
    }

    /// Aggregate with a per-call overall deadline (`None` disables it)
    ///
    /// # Errors
    /// As [`Aggregator::aggregate`].
    pub async fn aggregate_with_deadline(
        &self,
        product_id: impl Into<String>,
        deadline: Option<Duration>,
    ) -> Result<Product, AggregationError> {
        self.submit_with_deadline(product_id, deadline).await
    }

    /// Aggregate and block the calling thread
    ///
    /// Must not be called from inside an async context.
    ///
    /// # Errors
    /// As [`Aggregator::aggregate`].
    pub fn aggregate_blocking(&self, product_id: impl Into<String>) -> Result<Product, AggregationError> {
        self.submit(product_id).wait()
    }

    /// Start an aggregation and return immediately
    #[must_use]
    pub fn submit(&self, product_id: impl Into<String>) -> AggregationHandle {
        self.submit_with_deadline(product_id, self.deadlines.info)
    }

    /// Start an aggregation with a per-call overall deadline
    #[must_use]
    pub fn submit_with_deadline(
        &self,
        product_id: impl Into<String>,
        deadline: Option<Duration>,
    ) -> AggregationHandle {
        let id = AggregationId::new();
        let product_id = product_id.into();
        let span = tracing::info_span!("aggregate", aggregation = %id, product_id = %product_id);

        let this = self.clone();
        let join = self
            .pool
            .spawn(async move { this.run_pipeline(product_id, deadline).await }.instrument(span))
            .ok();

        AggregationHandle { id, join }
    }

    async fn run_pipeline(
        &self,
        product_id: String,
        info_deadline: Option<Duration>,
    ) -> Result<Product, AggregationError> {
        let started = Instant::now();
        let review_deadline = match self.deadlines.review {
            ReviewDeadline::Unbounded => None,
            ReviewDeadline::SameAsInfo => info_deadline,
        };

        let info_branch = {
            let port = Arc::clone(&self.ports.info);
            let id = product_id.clone();
            self.executor
                .spawn(BranchId::Info, info_deadline, move || port.fetch_product_info(&id))
        };
        let review_branch = {
            let port = Arc::clone(&self.ports.review);
            let id = product_id.clone();
            self.executor
                .spawn(BranchId::Review, review_deadline, move || port.fetch_review(&id))
        };

        let info = match self.recover(info_branch.outcome().await) {
            Ok(info) => info,
            Err(failure) => return Err(abort_aggregation(failure, &review_branch)),
        };

        let info = match self.stock_inventory(info).await {
            Ok(info) => info,
            Err(failure) => return Err(abort_aggregation(failure, &review_branch)),
        };

        let review = self
            .recover(review_branch.outcome().await)
            .map_err(AggregationError::Fatal)?;

        let product = Product::assemble(product_id, info, review)?;
        tracing::info!(
            options = product.options().len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "aggregation complete"
        );
        Ok(product)
    }

    /// Fan out one inventory branch per option and attach the results
    async fn stock_inventory(&self, mut info: ProductInfo) -> Result<ProductInfo, BranchFailure> {
        let branches: Vec<BranchHandle<_>> = info
            .options()
            .iter()
            .enumerate()
            .map(|(position, option)| {
                let port = Arc::clone(&self.ports.inventory);
                let option = option.clone();
                let branch = BranchId::inventory(option.id, position);
                self.executor
                    .spawn(branch, self.deadlines.inventory, move || port.fetch_inventory(&option))
            })
            .collect();

        let keyed = branches.into_iter().map(|handle| {
            let branch = handle.branch();
            handle.outcome().map(move |outcome| (branch, outcome))
        });

        for (branch, outcome) in join_all(keyed).await {
            let BranchId::Inventory { position, .. } = branch else {
                continue;
            };
            let inventory = self.recover(outcome)?;
            if let Some(slot) = info.options_mut().get_mut(position) {
                slot.attach_inventory(inventory);
            }
        }

        Ok(info)
    }

    fn recover<T: BranchValue>(&self, outcome: Result<T, BranchFailure>) -> Result<T, BranchFailure> {
        outcome.or_else(|failure| match self.policy.resolve(failure) {
            RecoveryOutcome::Default(value) => Ok(value),
            RecoveryOutcome::Abort(failure) => Err(failure),
        })
    }
}

fn abort_aggregation<T>(failure: BranchFailure, review: &BranchHandle<T>) -> AggregationError {
    // review has normally started by now; it runs to completion on its
    // worker and only its result is dropped
    review.abort();
    tracing::error!(failure = %failure, "aggregation aborted");
    AggregationError::Fatal(failure)
}

/// Pending aggregation
///
/// Resolves to the same result as [`Aggregator::aggregate`]. Await it from
/// async code or call [`AggregationHandle::wait`] from synchronous code.
#[derive(Debug)]
#[must_use = "an aggregation handle does nothing unless awaited or waited on"]
pub struct AggregationHandle {
    id: AggregationId,
    join: Option<JoinHandle<Result<Product, AggregationError>>>,
}

impl AggregationHandle {
    /// Aggregation identifier (also recorded on the tracing span)
    #[inline]
    #[must_use]
    pub fn id(&self) -> AggregationId {
        self.id
    }

    /// Check if the pipeline has finished
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop coordinating
    ///
    /// Queued lookups are cancelled. Lookups already running finish in the
    /// background and their results are discarded.
    pub fn abort(&self) {
        if let Some(join) = &self.join {
            join.abort();
        }
    }

    /// Block the calling thread until the pipeline finishes
    ///
    /// # Errors
    /// As [`Aggregator::aggregate`].
    pub fn wait(self) -> Result<Product, AggregationError> {
        futures::executor::block_on(self)
    }
}

impl Future for AggregationHandle {
    type Output = Result<Product, AggregationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(join) = self.join.as_mut() else {
            return Poll::Ready(Err(AggregationError::PoolClosed));
        };

        join.poll_unpin(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => {
                Err(AggregationError::Interrupted("aggregation aborted by caller".into()))
            }
            Err(err) => Err(AggregationError::Interrupted(err.to_string())),
        })
    }
}
