//! Aggregation Core - concurrent product detail assembly
//!
//! Builds a [`Product`](agg_model::Product) from independent upstream
//! lookups executed in parallel:
//! - Product info and review are fetched concurrently
//! - One inventory lookup per option fans out once info resolves
//! - Failures are classified per branch kind by a table-driven policy
//! - Deadlines bound the slow branches without blocking the caller
//!
//! # Example
//!
//! ```rust,ignore
//! use agg_core::{Aggregator, AggregatorConfig, SimulatedCatalog};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AggregatorConfig::new();
//! let aggregator = Aggregator::start(SimulatedCatalog::default().into_ports(), &config)?;
//!
//! let product = aggregator.aggregate("ABC123").await?;
//! println!("{} options, {} reviews", product.options().len(), product.review().count_of_reviews);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod policy;
pub mod pool;
pub mod ports;
pub mod simulated;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use config::{AggregatorConfig, ReviewDeadline};
pub use error::{
    AggregationError, BranchFailure, ConfigError, FailureKind, PoolError, TelemetryError,
    UpstreamError,
};
pub use executor::{BranchExecutor, BranchHandle};
pub use orchestrator::{AggregationHandle, Aggregator};
pub use policy::{BranchValue, RecoveryOutcome, RecoveryPolicy, Tolerance};
pub use pool::{PoolStats, WorkerPool};
pub use ports::{InventoryPort, ProductInfoPort, ReviewPort, UpstreamPorts};
pub use simulated::{SimulatedCatalog, SimulatedLatency};
pub use types::AggregationId;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the aggregator
    pub use crate::{
        AggregationError, AggregationHandle, Aggregator, AggregatorConfig, InventoryPort,
        ProductInfoPort, RecoveryPolicy, ReviewPort, UpstreamError, UpstreamPorts, WorkerPool,
    };
    pub use agg_model::{Inventory, Product, ProductInfo, ProductOption, Review};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
