//! Error types for product aggregation
//!
//! Provides error handling for:
//! - Upstream lookup failures
//! - Branch failures (upstream, timeout, panic, cancellation, rejection)
//! - Fatal aggregation errors surfaced to callers
//! - Configuration and telemetry setup

use agg_model::{BranchId, ModelError};
use std::time::Duration;

/// Failure reported by an upstream lookup port
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream error: {message}")]
pub struct UpstreamError {
    /// Human-readable cause
    pub message: String,
}

impl UpstreamError {
    /// Create upstream error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a branch did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    /// The lookup returned an error
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The deadline elapsed before the lookup finished
    #[error("timed out after {}ms", millis(.after))]
    Timeout { after: Duration },

    /// The lookup panicked on its worker
    #[error("lookup panicked: {0}")]
    Panicked(String),

    /// The worker task was aborted before completing
    #[error("lookup cancelled")]
    Cancelled,

    /// The worker pool was shut down before the lookup could start
    #[error("worker pool rejected the lookup")]
    Rejected,
}

/// Classified failure of a single branch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("branch {branch} failed ({}): {kind}", classification(.fatal))]
pub struct BranchFailure {
    /// Which branch failed
    pub branch: BranchId,
    /// Underlying cause
    pub kind: FailureKind,
    /// Set by the recovery policy once the failure is classified as fatal
    pub fatal: bool,
}

impl BranchFailure {
    /// Create an unclassified failure
    #[inline]
    #[must_use]
    pub fn new(branch: BranchId, kind: FailureKind) -> Self {
        Self {
            branch,
            kind,
            fatal: false,
        }
    }

    /// Mark this failure as fatal
    #[inline]
    #[must_use]
    pub fn into_fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Check if the branch ran out of time
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FailureKind::Timeout { .. })
    }
}

fn millis(after: &Duration) -> u128 {
    after.as_millis()
}

fn classification(fatal: &bool) -> &'static str {
    if *fatal {
        "fatal"
    } else {
        "recoverable"
    }
}

/// Errors surfaced by the aggregator
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// A branch failed and the recovery policy aborted the aggregation
    #[error("aggregation aborted: {0}")]
    Fatal(BranchFailure),

    /// The worker pool is shut down
    #[error("worker pool is shut down")]
    PoolClosed,

    /// The coordinating task died before producing a result
    #[error("aggregation interrupted: {0}")]
    Interrupted(String),

    /// Assembled composite violated a model invariant
    #[error("incomplete product: {0}")]
    Incomplete(#[from] ModelError),
}

impl AggregationError {
    /// The fatal branch failure, if that is what ended the aggregation
    #[inline]
    #[must_use]
    pub fn branch_failure(&self) -> Option<&BranchFailure> {
        match self {
            Self::Fatal(failure) => Some(failure),
            _ => None,
        }
    }

    /// Check if the aggregation ended because a deadline elapsed
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.branch_failure().is_some_and(BranchFailure::is_timeout)
    }
}

/// Worker pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Pool has been shut down
    #[error("worker pool is shut down")]
    Closed,

    /// Configuration rejected before start
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Runtime threads could not be started
    #[error("failed to start worker runtime: {0}")]
    Startup(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config text is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Logging bootstrap errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Filter directive did not parse
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed
    #[error("subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_failure_display_reports_classification() {
        let failure = BranchFailure::new(
            BranchId::Review,
            FailureKind::Upstream(UpstreamError::new("boom")),
        );
        assert_eq!(
            failure.to_string(),
            "branch review failed (recoverable): upstream error: boom"
        );
        assert!(failure.into_fatal().to_string().contains("(fatal)"));
    }

    #[test]
    fn timeout_is_detected_through_aggregation_error() {
        let failure = BranchFailure::new(
            BranchId::Info,
            FailureKind::Timeout {
                after: Duration::from_millis(50),
            },
        )
        .into_fatal();
        let err = AggregationError::Fatal(failure);

        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out after 50ms"));
        assert!(!AggregationError::PoolClosed.is_timeout());
    }

    #[test]
    fn upstream_error_converts_into_failure_kind() {
        let kind: FailureKind = UpstreamError::new("down").into();
        assert!(matches!(kind, FailureKind::Upstream(_)));
    }
}
