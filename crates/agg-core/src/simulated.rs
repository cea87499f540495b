//! Latency-simulating upstreams
//!
//! Stand-ins for the real lookup services: each call sleeps for its
//! configured delay and then returns a fixed payload.
//!
//! | lookup    | default delay | payload                                   |
//! |-----------|---------------|-------------------------------------------|
//! | info      | 1000 ms       | options `1/64GB/Black`, `2/128GB/Black`   |
//! | review    | 1000 ms       | 200 reviews, 4.5 average                  |
//! | inventory | 500 ms        | 2 units                                   |

use crate::error::UpstreamError;
use crate::ports::{InventoryPort, ProductInfoPort, ReviewPort, UpstreamPorts};
use agg_model::{Decimal, Inventory, ProductInfo, ProductOption, Review};
use std::time::Duration;

/// Per-lookup latency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedLatency {
    pub info: Duration,
    pub review: Duration,
    pub inventory: Duration,
}

impl SimulatedLatency {
    /// Same delay for every lookup
    #[inline]
    #[must_use]
    pub fn uniform(delay: Duration) -> Self {
        Self {
            info: delay,
            review: delay,
            inventory: delay,
        }
    }
}

impl Default for SimulatedLatency {
    fn default() -> Self {
        Self {
            info: Duration::from_millis(1000),
            review: Duration::from_millis(1000),
            inventory: Duration::from_millis(500),
        }
    }
}

/// Simulated catalog implementing all three ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedCatalog {
    latency: SimulatedLatency,
}

impl SimulatedCatalog {
    /// Create catalog with the given latency
    #[inline]
    #[must_use]
    pub fn new(latency: SimulatedLatency) -> Self {
        Self { latency }
    }

    /// Bundle this catalog as the aggregator's ports
    #[must_use]
    pub fn into_ports(self) -> UpstreamPorts {
        UpstreamPorts::new(self, self, self)
    }
}

impl ProductInfoPort for SimulatedCatalog {
    fn fetch_product_info(&self, product_id: &str) -> Result<ProductInfo, UpstreamError> {
        std::thread::sleep(self.latency.info);
        Ok(ProductInfo::new(
            product_id,
            vec![
                ProductOption::new(1, "64GB", "Black", Decimal::new(69999, 2)),
                ProductOption::new(2, "128GB", "Black", Decimal::new(74999, 2)),
            ],
        ))
    }
}

impl ReviewPort for SimulatedCatalog {
    fn fetch_review(&self, _product_id: &str) -> Result<Review, UpstreamError> {
        std::thread::sleep(self.latency.review);
        Ok(Review::new(200, 4.5))
    }
}

impl InventoryPort for SimulatedCatalog {
    fn fetch_inventory(&self, _option: &ProductOption) -> Result<Inventory, UpstreamError> {
        std::thread::sleep(self.latency.inventory);
        Ok(Inventory::new(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_returns_fixed_payloads() {
        let catalog = SimulatedCatalog::new(SimulatedLatency::uniform(Duration::ZERO));

        let info = catalog.fetch_product_info("ABC123").unwrap();
        assert_eq!(info.product_id, "ABC123");
        assert_eq!(info.option_count(), 2);
        assert_eq!(info.options()[1].capacity, "128GB");

        assert_eq!(catalog.fetch_review("ABC123").unwrap(), Review::new(200, 4.5));
        assert_eq!(
            catalog.fetch_inventory(&info.options()[0]).unwrap(),
            Inventory::new(2)
        );
    }

    #[test]
    fn default_latency_matches_service_profile() {
        let latency = SimulatedLatency::default();
        assert_eq!(latency.info, Duration::from_secs(1));
        assert_eq!(latency.inventory, Duration::from_millis(500));
    }
}
