//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Sources are layered
//! in increasing precedence: defaults, configuration file, environment.

use super::TaskmeshConfig;
use crate::error::TaskmeshResult;
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix for environment overrides, e.g. `TASKMESH__CACHE__MAX_PARCEL_AGE_SECONDS`
pub const ENV_PREFIX: &str = "TASKMESH";

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TaskmeshConfig,
    environment: String,
    config_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from `config/taskmesh.*` (if present) and the environment
    pub fn load() -> TaskmeshResult<Arc<ConfigManager>> {
        Self::load_from_file(None)
    }

    /// Load with an explicit configuration file; `None` uses the default location
    pub fn load_from_file(path: Option<&Path>) -> TaskmeshResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        let defaults = Config::try_from(&TaskmeshConfig::default())?;

        let mut builder = Config::builder().add_source(defaults);
        let config_file = match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
                Some(path.to_path_buf())
            }
            None => {
                builder = builder.add_source(File::with_name("config/taskmesh").required(false));
                None
            }
        };
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: TaskmeshConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            config = %serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string()),
            "Configuration resolved"
        );
        info!(
            environment = %environment,
            config_file = ?config_file,
            sweep_period_seconds = config.cache.sweep_period_seconds,
            max_parcel_age_seconds = config.cache.max_parcel_age_seconds,
            "🔧 Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            config_file,
        }))
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: TaskmeshConfig) -> TaskmeshResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_file: None,
        }))
    }

    pub fn config(&self) -> &TaskmeshConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Current environment name from `TASKMESH_ENV`, defaulting to `development`
    pub fn detect_environment() -> String {
        std::env::var("TASKMESH_ENV").unwrap_or_else(|_| "development".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[cache]\nsweep_period_seconds = 5\nmax_parcel_age_seconds = 30\n\n[logging]\njson = true"
        )
        .unwrap();

        let manager = ConfigManager::load_from_file(Some(file.path())).unwrap();
        let config = manager.config();
        assert_eq!(config.cache.sweep_period_seconds, 5);
        assert_eq!(config.cache.max_parcel_age_seconds, 30);
        assert_eq!(config.cache.sweep_initial_delay_seconds, 0);
        assert!(config.logging.json);
        assert_eq!(config.distribution.wildcard_target, "*");
        assert_eq!(manager.config_file(), Some(file.path()));
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[cache]\nsweep_period_seconds = 0").unwrap();

        assert!(ConfigManager::load_from_file(Some(file.path())).is_err());
    }

    #[test]
    fn test_oversized_max_age_in_file_is_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[cache]\nmax_parcel_age_seconds = 4611686018427387904").unwrap();

        let err = ConfigManager::load_from_file(Some(file.path())).unwrap_err();
        assert!(matches!(err, crate::error::TaskmeshError::Configuration(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/nonexistent/taskmesh.toml");
        assert!(ConfigManager::load_from_file(Some(missing)).is_err());
    }
}
