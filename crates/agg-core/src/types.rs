//! Identifiers shared across the aggregator

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique aggregation identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregationId(pub Ulid);

impl AggregationId {
    /// Generate new aggregation ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AggregationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
