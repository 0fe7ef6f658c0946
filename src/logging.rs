//! # Structured Logging Module
//!
//! Environment-aware structured logging for embedding hosts. Installs a
//! `tracing-subscriber` registry once per process; when the host already set a
//! global subscriber, that one is kept.

use crate::config::{ConfigManager, LoggingConfig};
use crate::identity::Fdn;
use crate::state_machine::ProcessingStatus;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific defaults
pub fn init_structured_logging() {
    init_with_config(&LoggingConfig::default());
}

/// Initialize structured logging from the `logging` configuration section
pub fn init_with_config(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let directive = config
            .filter
            .clone()
            .unwrap_or_else(|| get_log_level(&environment).to_string());

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(EnvFilter::new(&directive))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(&directive))
                .boxed()
        };

        // A host-installed subscriber takes precedence
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            environment = %environment,
            filter = %directive,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Default filter directive per environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for parcel operations
pub fn log_parcel_operation(
    operation: &str,
    parcel_id: &Fdn,
    episode_id: Option<&Fdn>,
    status: ProcessingStatus,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        parcel_id = %parcel_id,
        episode_id = episode_id.map(|e| e.token()),
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 PARCEL_OPERATION"
    );
}

/// Log structured data for distribution passes
pub fn log_distribution_operation(task_id: &Fdn, subscribers: usize, dispatched: usize, failed: usize) {
    tracing::info!(
        task_id = %task_id,
        subscribers = subscribers,
        dispatched = dispatched,
        failed = failed,
        timestamp = %Utc::now().to_rfc3339(),
        "📤 DISTRIBUTION_OPERATION"
    );
}
