//! Enrichment values attached to a product during aggregation

use serde::{Deserialize, Serialize};

/// Stock level for a single product option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inventory {
    /// Units available
    pub count: u32,
}

impl Inventory {
    /// Create inventory with the given unit count
    #[inline]
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self { count }
    }
}

/// Aggregated review summary for a product
///
/// A review with zero reviews is indistinguishable from one substituted
/// after a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Number of reviews submitted
    pub count_of_reviews: u64,
    /// Mean rating across all reviews
    pub average_rating: f64,
}

impl Review {
    /// Create review summary
    #[inline]
    #[must_use]
    pub fn new(count_of_reviews: u64, average_rating: f64) -> Self {
        Self {
            count_of_reviews,
            average_rating,
        }
    }

    /// True when no reviews were recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count_of_reviews == 0
    }
}
