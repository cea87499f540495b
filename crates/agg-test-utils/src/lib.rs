//! Testing utilities for the aggregation workspace
//!
//! Scripted upstream ports, fixtures, and aggregator setup helpers.

#![allow(missing_docs)]

use agg_core::{
    Aggregator, AggregatorConfig, InventoryPort, ProductInfoPort, ReviewPort, UpstreamError,
    UpstreamPorts,
};
use agg_model::{Decimal, Inventory, ProductInfo, ProductOption, Review};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a scripted lookup does when called
#[derive(Debug, Clone, PartialEq)]
pub enum Script<T> {
    Return(T),
    Fail(String),
}

impl<T: Clone> Script<T> {
    fn play(&self) -> Result<T, UpstreamError> {
        match self {
            Script::Return(value) => Ok(value.clone()),
            Script::Fail(message) => Err(UpstreamError::new(message.clone())),
        }
    }
}

/// Calls observed by a scripted catalog
#[derive(Debug, Default)]
pub struct CallLog {
    info: AtomicUsize,
    review: AtomicUsize,
    inventory: Mutex<Vec<u32>>,
}

impl CallLog {
    pub fn info_calls(&self) -> usize {
        self.info.load(Ordering::SeqCst)
    }

    pub fn review_calls(&self) -> usize {
        self.review.load(Ordering::SeqCst)
    }

    /// Option ids passed to the inventory lookup, in call order
    pub fn inventory_calls(&self) -> Vec<u32> {
        self.inventory.lock().clone()
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedCatalog {
    info: Script<Vec<ProductOption>>,
    review: Script<Review>,
    inventory: Script<Inventory>,
    info_delay: Duration,
    review_delay: Duration,
    inventory_delay: Duration,
    calls: Arc<CallLog>,
}

impl ScriptedCatalog {
    /// Every lookup succeeds immediately with the ABC123 fixture data
    pub fn healthy() -> Self {
        Self {
            info: Script::Return(abc123_options()),
            review: Script::Return(Review::new(200, 4.5)),
            inventory: Script::Return(Inventory::new(2)),
            info_delay: Duration::ZERO,
            review_delay: Duration::ZERO,
            inventory_delay: Duration::ZERO,
            calls: Arc::new(CallLog::default()),
        }
    }

    pub fn with_options(mut self, options: Vec<ProductOption>) -> Self {
        self.info = Script::Return(options);
        self
    }

    pub fn failing_info(mut self, message: &str) -> Self {
        self.info = Script::Fail(message.to_string());
        self
    }

    pub fn failing_review(mut self, message: &str) -> Self {
        self.review = Script::Fail(message.to_string());
        self
    }

    pub fn failing_inventory(mut self, message: &str) -> Self {
        self.inventory = Script::Fail(message.to_string());
        self
    }

    pub fn with_inventory(mut self, count: u32) -> Self {
        self.inventory = Script::Return(Inventory::new(count));
        self
    }

    pub fn with_info_delay(mut self, delay: Duration) -> Self {
        self.info_delay = delay;
        self
    }

    pub fn with_review_delay(mut self, delay: Duration) -> Self {
        self.review_delay = delay;
        self
    }

    pub fn with_inventory_delay(mut self, delay: Duration) -> Self {
        self.inventory_delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<CallLog> {
        Arc::clone(&self.calls)
    }

    pub fn into_ports(self) -> UpstreamPorts {
        UpstreamPorts::new(self.clone(), self.clone(), self)
    }
}

impl ProductInfoPort for ScriptedCatalog {
    fn fetch_product_info(&self, product_id: &str) -> Result<ProductInfo, UpstreamError> {
        self.calls.info.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.info_delay);
        self.info
            .play()
            .map(|options| ProductInfo::new(product_id, options))
    }
}

impl ReviewPort for ScriptedCatalog {
    fn fetch_review(&self, _product_id: &str) -> Result<Review, UpstreamError> {
        self.calls.review.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.review_delay);
        self.review.play()
    }
}

impl InventoryPort for ScriptedCatalog {
    fn fetch_inventory(&self, option: &ProductOption) -> Result<Inventory, UpstreamError> {
        self.calls.inventory.lock().push(option.id);
        std::thread::sleep(self.inventory_delay);
        self.inventory.play()
    }
}

/// Options returned for the ABC123 scenario
pub fn abc123_options() -> Vec<ProductOption> {
    vec![
        ProductOption::new(1, "64GB", "Black", Decimal::new(69999, 2)),
        ProductOption::new(2, "128GB", "Black", Decimal::new(74999, 2)),
    ]
}

/// Options with ids `0..count`
pub fn numbered_options(count: u32) -> Vec<ProductOption> {
    (0..count)
        .map(|id| {
            let capacity = format!("{}GB", 32 << (id % 4));
            ProductOption::new(id, capacity, "Black", Decimal::from(100 + id))
        })
        .collect()
}

/// Small pool, two-second info deadline
pub fn test_config() -> AggregatorConfig {
    AggregatorConfig::new()
        .with_worker_threads(4)
        .with_info_timeout(Some(Duration::from_secs(2)))
}

pub fn setup_aggregator(catalog: ScriptedCatalog) -> Aggregator {
    setup_aggregator_with(catalog, &test_config())
}

pub fn setup_aggregator_with(catalog: ScriptedCatalog, config: &AggregatorConfig) -> Aggregator {
    Aggregator::start(catalog.into_ports(), config).unwrap()
}
