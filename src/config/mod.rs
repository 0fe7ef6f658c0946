//! # Configuration
//!
//! Layered configuration for the orchestration core: built-in defaults, an
//! optional configuration file, then `TASKMESH__`-prefixed environment
//! variables (double underscore separates nesting levels).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use taskmesh_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let sweep_period = manager.config().cache.sweep_period();
//! let max_age = manager.config().cache.max_parcel_age();
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::{
    DEFAULT_MAX_PARCEL_AGE_SECONDS, DEFAULT_SWEEP_PERIOD_SECONDS, MAX_CONFIGURED_SECONDS,
    WILDCARD_TARGET,
};
use crate::error::{TaskmeshError, TaskmeshResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct TaskmeshConfig {
    /// Task cache and housekeeping sweep
    #[serde(default)]
    pub cache: CacheConfig,

    /// Task distribution
    #[serde(default)]
    pub distribution: DistributionConfig,

    /// Structured logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TaskmeshConfig {
    pub fn validate(&self) -> TaskmeshResult<()> {
        if self.cache.sweep_period_seconds == 0 {
            return Err(TaskmeshError::Configuration(
                "cache.sweep_period_seconds must be greater than zero".to_string(),
            ));
        }
        if self.cache.max_parcel_age_seconds == 0 {
            return Err(TaskmeshError::Configuration(
                "cache.max_parcel_age_seconds must be greater than zero".to_string(),
            ));
        }
        for (key, value) in [
            ("cache.sweep_period_seconds", self.cache.sweep_period_seconds),
            ("cache.sweep_initial_delay_seconds", self.cache.sweep_initial_delay_seconds),
            ("cache.max_parcel_age_seconds", self.cache.max_parcel_age_seconds),
        ] {
            if value > MAX_CONFIGURED_SECONDS {
                return Err(TaskmeshError::Configuration(format!(
                    "{key} must not exceed {MAX_CONFIGURED_SECONDS} seconds, got {value}"
                )));
            }
        }
        if self.distribution.wildcard_target.is_empty() {
            return Err(TaskmeshError::Configuration(
                "distribution.wildcard_target must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Period between housekeeping sweeps
    pub sweep_period_seconds: u64,
    /// Delay before the first sweep
    pub sweep_initial_delay_seconds: u64,
    /// Terminal parcels older than this are evicted
    pub max_parcel_age_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_period_seconds: DEFAULT_SWEEP_PERIOD_SECONDS,
            sweep_initial_delay_seconds: 0,
            max_parcel_age_seconds: DEFAULT_MAX_PARCEL_AGE_SECONDS,
        }
    }
}

impl CacheConfig {
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_seconds)
    }

    pub fn sweep_initial_delay(&self) -> Duration {
        Duration::from_secs(self.sweep_initial_delay_seconds)
    }

    pub fn max_parcel_age(&self) -> Duration {
        Duration::from_secs(self.max_parcel_age_seconds)
    }

    /// Maximum parcel age as a signed chrono duration for date arithmetic
    pub fn max_parcel_age_delta(&self) -> TaskmeshResult<chrono::Duration> {
        i64::try_from(self.max_parcel_age_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                TaskmeshError::Configuration(format!(
                    "cache.max_parcel_age_seconds is out of range: {}",
                    self.max_parcel_age_seconds
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Intended-target value meaning "any subscriber"
    pub wildcard_target: String,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            wildcard_target: WILDCARD_TARGET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Explicit `EnvFilter` directive; environment default when unset
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = TaskmeshConfig::default();
        assert_eq!(config.cache.sweep_period(), Duration::from_secs(60));
        assert_eq!(config.cache.max_parcel_age(), Duration::from_secs(600));
        assert_eq!(config.distribution.wildcard_target, "*");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_periods() {
        let mut config = TaskmeshConfig::default();
        config.cache.sweep_period_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(TaskmeshError::Configuration(_))
        ));

        let mut config = TaskmeshConfig::default();
        config.cache.max_parcel_age_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        for value in [u64::MAX, 1 << 62, MAX_CONFIGURED_SECONDS + 1] {
            let mut config = TaskmeshConfig::default();
            config.cache.max_parcel_age_seconds = value;
            assert!(
                matches!(config.validate(), Err(TaskmeshError::Configuration(_))),
                "max_parcel_age_seconds = {value}"
            );

            let mut config = TaskmeshConfig::default();
            config.cache.sweep_period_seconds = value;
            assert!(config.validate().is_err(), "sweep_period_seconds = {value}");

            let mut config = TaskmeshConfig::default();
            config.cache.sweep_initial_delay_seconds = value;
            assert!(config.validate().is_err(), "sweep_initial_delay_seconds = {value}");
        }

        let mut config = TaskmeshConfig::default();
        config.cache.max_parcel_age_seconds = MAX_CONFIGURED_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_parcel_age_delta_never_wraps() {
        let cache = CacheConfig {
            max_parcel_age_seconds: u64::MAX,
            ..CacheConfig::default()
        };
        assert!(matches!(
            cache.max_parcel_age_delta(),
            Err(TaskmeshError::Configuration(_))
        ));

        let cache = CacheConfig {
            max_parcel_age_seconds: 1 << 62,
            ..CacheConfig::default()
        };
        assert!(cache.max_parcel_age_delta().is_err());

        assert_eq!(
            CacheConfig::default().max_parcel_age_delta().unwrap(),
            chrono::Duration::minutes(10)
        );
    }
}
