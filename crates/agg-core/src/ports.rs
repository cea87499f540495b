//! Upstream lookup ports
//!
//! The three blocking capabilities the aggregator consumes. Implementations
//! may block for an arbitrary duration and may fail; retries, if any, are
//! their own business.

use crate::error::UpstreamError;
use agg_model::{Inventory, ProductInfo, ProductOption, Review};
use std::fmt;
use std::sync::Arc;

/// Product info lookup
#[cfg_attr(test, mockall::automock)]
pub trait ProductInfoPort: Send + Sync {
    /// Fetch product info and its ordered options
    fn fetch_product_info(&self, product_id: &str) -> Result<ProductInfo, UpstreamError>;
}

/// Review lookup
#[cfg_attr(test, mockall::automock)]
pub trait ReviewPort: Send + Sync {
    /// Fetch the review summary for a product
    fn fetch_review(&self, product_id: &str) -> Result<Review, UpstreamError>;
}

/// Inventory lookup
#[cfg_attr(test, mockall::automock)]
pub trait InventoryPort: Send + Sync {
    /// Fetch stock for a single option
    fn fetch_inventory(&self, option: &ProductOption) -> Result<Inventory, UpstreamError>;
}

/// The set of ports one aggregator talks to
#[derive(Clone)]
pub struct UpstreamPorts {
    pub(crate) info: Arc<dyn ProductInfoPort>,
    pub(crate) review: Arc<dyn ReviewPort>,
    pub(crate) inventory: Arc<dyn InventoryPort>,
}

impl UpstreamPorts {
    /// Bundle three port implementations
    #[must_use]
    pub fn new(
        info: impl ProductInfoPort + 'static,
        review: impl ReviewPort + 'static,
        inventory: impl InventoryPort + 'static,
    ) -> Self {
        Self {
            info: Arc::new(info),
            review: Arc::new(review),
            inventory: Arc::new(inventory),
        }
    }

    /// Bundle already shared port implementations
    #[must_use]
    pub fn from_shared(
        info: Arc<dyn ProductInfoPort>,
        review: Arc<dyn ReviewPort>,
        inventory: Arc<dyn InventoryPort>,
    ) -> Self {
        Self {
            info,
            review,
            inventory,
        }
    }
}

impl fmt::Debug for UpstreamPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamPorts").finish_non_exhaustive()
    }
}
