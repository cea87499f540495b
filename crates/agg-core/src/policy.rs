//! Recovery policy
//!
//! Table-driven classification of branch failures. The table maps a
//! [`BranchKind`] to a [`Tolerance`]; the default value substituted on a
//! recoverable failure is declared by the branch's value type through
//! [`BranchValue::fallback`]. The orchestrator never decides fatality itself.
//!
//! | kind      | tolerance   | fallback                         |
//! |-----------|-------------|----------------------------------|
//! | info      | fatal       | none                             |
//! | review    | recoverable | `Review { 0 reviews, 0.0 }`      |
//! | inventory | recoverable | `Inventory { count: 1 }`         |

use crate::error::BranchFailure;
use agg_model::{BranchKind, Inventory, ProductInfo, Review};
use std::collections::HashMap;

/// How a branch kind tolerates failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerance {
    /// Failure aborts the aggregation
    Fatal,
    /// Failure is replaced by the value type's fallback
    Recoverable,
}

/// Value produced by a branch
pub trait BranchValue: Sized + Send + 'static {
    /// Branch kind producing this value
    const KIND: BranchKind;

    /// Value substituted when a recoverable branch fails
    fn fallback() -> Option<Self> {
        None
    }
}

impl BranchValue for ProductInfo {
    const KIND: BranchKind = BranchKind::Info;
}

impl BranchValue for Review {
    const KIND: BranchKind = BranchKind::Review;

    fn fallback() -> Option<Self> {
        Some(Review::new(0, 0.0))
    }
}

impl BranchValue for Inventory {
    const KIND: BranchKind = BranchKind::Inventory;

    // nonzero so downstream stock checks never see a false out-of-stock
    fn fallback() -> Option<Self> {
        Some(Inventory::new(1))
    }
}

/// Result of consulting the policy
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome<T> {
    /// Stop the aggregation with this (now fatal) failure
    Abort(BranchFailure),
    /// Continue with the substituted value
    Default(T),
}

/// Per-kind failure tolerance table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    table: HashMap<BranchKind, Tolerance>,
}

impl RecoveryPolicy {
    /// Empty table; every kind is fatal until declared otherwise
    #[must_use]
    pub fn strict() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Info is fatal, enrichments are recoverable
    #[must_use]
    pub fn standard() -> Self {
        Self::strict()
            .with_tolerance(BranchKind::Info, Tolerance::Fatal)
            .with_tolerance(BranchKind::Review, Tolerance::Recoverable)
            .with_tolerance(BranchKind::Inventory, Tolerance::Recoverable)
    }

    /// Declare the tolerance of a branch kind
    #[inline]
    #[must_use]
    pub fn with_tolerance(mut self, kind: BranchKind, tolerance: Tolerance) -> Self {
        self.table.insert(kind, tolerance);
        self
    }

    /// Tolerance of a branch kind (undeclared kinds are fatal)
    #[inline]
    #[must_use]
    pub fn tolerance(&self, kind: BranchKind) -> Tolerance {
        self.table.get(&kind).copied().unwrap_or(Tolerance::Fatal)
    }

    /// Classify a failure
    ///
    /// Recovery needs both a recoverable tolerance and a fallback value;
    /// anything else aborts.
    #[must_use]
    pub fn resolve<T: BranchValue>(&self, failure: BranchFailure) -> RecoveryOutcome<T> {
        let kind = failure.branch.kind();
        debug_assert_eq!(kind, T::KIND, "failure routed to the wrong value type");

        match (self.tolerance(kind), T::fallback()) {
            (Tolerance::Recoverable, Some(value)) => {
                tracing::warn!(branch = %failure.branch, cause = %failure.kind, "defaulted");
                RecoveryOutcome::Default(value)
            }
            _ => {
                tracing::error!(branch = %failure.branch, cause = %failure.kind, "aborting");
                RecoveryOutcome::Abort(failure.into_fatal())
            }
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, UpstreamError};
    use agg_model::BranchId;
    use std::time::Duration;

    fn upstream(branch: BranchId) -> BranchFailure {
        BranchFailure::new(branch, FailureKind::Upstream(UpstreamError::new("boom")))
    }

    #[test]
    fn info_failure_aborts() {
        let outcome = RecoveryPolicy::standard().resolve::<ProductInfo>(upstream(BranchId::Info));
        match outcome {
            RecoveryOutcome::Abort(failure) => {
                assert!(failure.fatal);
                assert_eq!(failure.branch, BranchId::Info);
            }
            RecoveryOutcome::Default(_) => panic!("info must never be defaulted"),
        }
    }

    #[test]
    fn info_timeout_aborts() {
        let failure = BranchFailure::new(
            BranchId::Info,
            FailureKind::Timeout {
                after: Duration::from_millis(10),
            },
        );
        let outcome = RecoveryPolicy::standard().resolve::<ProductInfo>(failure);
        assert!(matches!(outcome, RecoveryOutcome::Abort(f) if f.is_timeout()));
    }

    #[test]
    fn review_failure_defaults_to_zero_reviews() {
        let outcome = RecoveryPolicy::standard().resolve::<Review>(upstream(BranchId::Review));
        assert_eq!(outcome, RecoveryOutcome::Default(Review::new(0, 0.0)));
    }

    #[test]
    fn inventory_failure_defaults_to_one_unit() {
        let outcome =
            RecoveryPolicy::standard().resolve::<Inventory>(upstream(BranchId::inventory(1, 0)));
        assert_eq!(outcome, RecoveryOutcome::Default(Inventory::new(1)));
    }

    #[test]
    fn recoverable_info_still_aborts_without_fallback() {
        let policy = RecoveryPolicy::standard().with_tolerance(BranchKind::Info, Tolerance::Recoverable);
        let outcome = policy.resolve::<ProductInfo>(upstream(BranchId::Info));
        assert!(matches!(outcome, RecoveryOutcome::Abort(_)));
    }

    #[test]
    fn strict_policy_makes_enrichments_fatal() {
        let outcome = RecoveryPolicy::strict().resolve::<Review>(upstream(BranchId::Review));
        assert!(matches!(outcome, RecoveryOutcome::Abort(f) if f.fatal));
    }

    #[test]
    fn standard_table_covers_every_kind() {
        let policy = RecoveryPolicy::default();
        assert_eq!(policy.tolerance(BranchKind::Info), Tolerance::Fatal);
        for kind in [BranchKind::Review, BranchKind::Inventory] {
            assert_eq!(policy.tolerance(kind), Tolerance::Recoverable);
        }
    }

    #[test]
    fn defaults_are_identical_across_calls() {
        let policy = RecoveryPolicy::standard();
        let first = policy.resolve::<Review>(upstream(BranchId::Review));
        let second = policy.resolve::<Review>(upstream(BranchId::Review));
        assert_eq!(first, second);
    }
}
