//! Pipeline options.
//!
//! Use [`Default`] for common cases, or load overrides from TOML:
//!
//! ```rust
//! use bronze_ingest::config::IngestionOptions;
//!
//! let opts = IngestionOptions::from_toml_str(
//!     r#"
//!     preview_rows = 10
//!     date_format = "%d.%m.%Y"
//!
//!     [retry]
//!     max_attempts = 5
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(opts.preview_rows, 10);
//! assert_eq!(opts.retry.max_attempts, 5);
//! assert_eq!(opts.retry.multiplier, 2); // defaulted
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::observability::IngestionSeverity;
use crate::processing::DEFAULT_DATE_FORMAT;

/// Options controlling preview, validation, commit retries, and alerting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionOptions {
    /// Rows exposed by a preview (the full row set is still computed).
    pub preview_rows: usize,
    /// The accepted format for `date` manual fields (chrono syntax).
    pub date_format: String,
    /// Retry behavior for transient commit failures.
    pub retry: RetryPolicy,
    /// Severity threshold at which observers' `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            retry: RetryPolicy::default(),
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestionOptions {
    /// Parse options from TOML; missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Load {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Read options from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |message: String| ConfigError::Load {
            path: path.display().to_string(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        toml::from_str(&text).map_err(|e| load_err(e.to_string()))
    }
}

/// Bounded exponential backoff for transient commit failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1 is always made).
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single wait.
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive waits.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately (useful in tests).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            multiplier: 1,
        }
    }

    /// Wait before attempt number `attempt` (1-based; the first attempt never waits).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(attempt - 2);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
