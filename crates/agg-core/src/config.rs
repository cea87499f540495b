//! Aggregator configuration
//!
//! Loaded from TOML or built in code. Every field has a default, so an
//! empty document is a valid configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Deadline applied to the review branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDeadline {
    /// Wait for the review lookup however long it takes
    #[default]
    Unbounded,
    /// Bound the review lookup by the same deadline as product info
    SameAsInfo,
}

/// Aggregator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Concurrently running branch lookups (`None` = available parallelism)
    pub worker_threads: Option<usize>,
    /// Async threads driving the orchestrators
    pub coordinator_threads: usize,
    /// Overall deadline on the product info branch, in milliseconds
    pub info_timeout_ms: Option<u64>,
    /// Deadline policy for the review branch
    pub review_timeout: ReviewDeadline,
    /// Deadline on each inventory branch, in milliseconds
    pub inventory_timeout_ms: Option<u64>,
    /// Drain window when the worker pool shuts down, in milliseconds
    pub shutdown_grace_ms: u64,
}

impl AggregatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown value shapes
    /// - `ConfigError::Invalid` if validation fails
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - otherwise as [`AggregatorConfig::from_toml_str`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the worker pool or deadlines cannot honor
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid("worker_threads must be at least 1".into()));
        }
        if self.coordinator_threads == 0 {
            return Err(ConfigError::Invalid(
                "coordinator_threads must be at least 1".into(),
            ));
        }
        if self.info_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("info_timeout_ms must be positive".into()));
        }
        if self.inventory_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "inventory_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// With explicit worker bound
    #[inline]
    #[must_use]
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = Some(workers);
        self
    }

    /// With overall info deadline (`None` disables it)
    #[inline]
    #[must_use]
    pub fn with_info_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.info_timeout_ms = timeout.map(duration_ms);
        self
    }

    /// With review deadline policy
    #[inline]
    #[must_use]
    pub fn with_review_timeout(mut self, policy: ReviewDeadline) -> Self {
        self.review_timeout = policy;
        self
    }

    /// With per-option inventory deadline
    #[inline]
    #[must_use]
    pub fn with_inventory_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inventory_timeout_ms = timeout.map(duration_ms);
        self
    }

    /// With shutdown drain window
    #[inline]
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = duration_ms(grace);
        self
    }

    /// Resolved worker bound
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Info deadline as a duration
    #[inline]
    #[must_use]
    pub fn info_timeout(&self) -> Option<Duration> {
        self.info_timeout_ms.map(Duration::from_millis)
    }

    /// Inventory deadline as a duration
    #[inline]
    #[must_use]
    pub fn inventory_timeout(&self) -> Option<Duration> {
        self.inventory_timeout_ms.map(Duration::from_millis)
    }

    /// Shutdown drain window as a duration
    #[inline]
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            coordinator_threads: 1,
            info_timeout_ms: Some(2000),
            review_timeout: ReviewDeadline::Unbounded,
            inventory_timeout_ms: None,
            shutdown_grace_ms: 5000,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AggregatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, AggregatorConfig::default());
        assert_eq!(config.info_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.review_timeout, ReviewDeadline::Unbounded);
    }

    #[test]
    fn parses_all_fields() {
        let config = AggregatorConfig::from_toml_str(
            r#"
            worker_threads = 4
            coordinator_threads = 2
            info_timeout_ms = 750
            review_timeout = "same_as_info"
            inventory_timeout_ms = 300
            shutdown_grace_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.effective_workers(), 4);
        assert_eq!(config.coordinator_threads, 2);
        assert_eq!(config.info_timeout(), Some(Duration::from_millis(750)));
        assert_eq!(config.review_timeout, ReviewDeadline::SameAsInfo);
        assert_eq!(config.inventory_timeout(), Some(Duration::from_millis(300)));
        assert_eq!(config.shutdown_grace(), Duration::from_millis(100));
    }

    #[test]
    fn rejects_zero_workers() {
        let err = AggregatorConfig::from_toml_str("worker_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_deadline() {
        let err = AggregatorConfig::from_toml_str("info_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = AggregatorConfig::from_toml_str("review_timeout = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_threads = 3").unwrap();

        let config = AggregatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.worker_threads, Some(3));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AggregatorConfig::from_file("/nonexistent/aggregator.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn default_workers_follow_available_parallelism() {
        assert!(AggregatorConfig::default().effective_workers() >= 1);
    }

    #[test]
    fn builder_round_trips_durations() {
        let config = AggregatorConfig::new()
            .with_info_timeout(None)
            .with_inventory_timeout(Some(Duration::from_millis(40)));
        assert_eq!(config.info_timeout(), None);
        assert_eq!(config.inventory_timeout(), Some(Duration::from_millis(40)));
    }
}
