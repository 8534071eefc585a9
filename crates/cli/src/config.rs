//! Allocation configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOCK_ALLOC_EXPIRY_THRESHOLD_DAYS` - Treat batches expiring within this many days as expired (default: 0)
//! - `STOCK_ALLOC_ROUNDING` - `nearest` or `meet_requested` (default: nearest)
//! - `STOCK_ALLOC_ALLOW_PARTIAL_PACKS` - Issue fractions of a pack (default: false)
//! - `STOCK_ALLOC_SUPPRESS_OVER_REQUEST` - Don't report unreachable requests (default: false)
//! - `STOCK_ALLOC_DEBOUNCE_MS` - Quiet period before typed input is applied (default: 500)
//! - `STOCK_ALLOC_TODAY` - Override the current date, ISO format (default: today)

use std::time::Duration;

use chrono::NaiveDate;
use stock_allocation_core::{AllocationOptions, PackRounding};
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Allocation settings for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationConfig {
    pub expiry_threshold_days: u32,
    pub rounding: PackRounding,
    pub allow_partial_packs: bool,
    pub suppress_over_request: bool,
    pub debounce: Duration,
    /// Fixed current date, for reproducible runs.
    pub today: Option<NaiveDate>,
}

impl AllocationConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let expiry_threshold_days = parse_or(&lookup, "STOCK_ALLOC_EXPIRY_THRESHOLD_DAYS", 0_u32)?;
        let rounding = parse_or(&lookup, "STOCK_ALLOC_ROUNDING", PackRounding::Nearest)?;
        let allow_partial_packs = parse_bool_or(&lookup, "STOCK_ALLOC_ALLOW_PARTIAL_PACKS", false)?;
        let suppress_over_request =
            parse_bool_or(&lookup, "STOCK_ALLOC_SUPPRESS_OVER_REQUEST", false)?;
        let debounce_ms = parse_or(&lookup, "STOCK_ALLOC_DEBOUNCE_MS", 500_u64)?;
        let today = lookup("STOCK_ALLOC_TODAY")
            .map(|value| {
                value.trim().parse::<NaiveDate>().map_err(|e| {
                    ConfigError::InvalidEnvVar("STOCK_ALLOC_TODAY".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            expiry_threshold_days,
            rounding,
            allow_partial_packs,
            suppress_over_request,
            debounce: Duration::from_millis(debounce_ms),
            today,
        })
    }

    /// Session options for these settings.
    #[must_use]
    pub const fn allocation_options(&self) -> AllocationOptions {
        AllocationOptions {
            expiry_threshold_days: self.expiry_threshold_days,
            rounding: self.rounding,
            allow_partial_packs: self.allow_partial_packs,
            suppress_over_request_warning: self.suppress_over_request,
            debounce: self.debounce,
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            expiry_threshold_days: 0,
            rounding: PackRounding::Nearest,
            allow_partial_packs: false,
            suppress_over_request: false,
            debounce: Duration::from_millis(500),
            today: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a boolean flag. Accepts `true`/`false`/`1`/`0`/`yes`/`no`.
fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other:?}"),
        )),
    }
}
