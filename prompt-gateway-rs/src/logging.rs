//! # Structured Logging
//!
//! Installs the global `tracing` subscriber for the gateway. `log` records
//! from shared crates are forwarded into the same subscriber.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

use config_rs::get_env_or;

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to set global subscriber: {0}")]
    Initialization(String),
}

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "prompt-gateway".to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Reads `LOG_LEVEL` and `LOG_FORMAT` (`json` or `text`)
    pub fn from_env(service_name: &str) -> Self {
        let format = get_env_or("LOG_FORMAT", "text");
        Self {
            level: get_env_or("LOG_LEVEL", "info"),
            service_name: service_name.to_string(),
            json_format: format.eq_ignore_ascii_case("json"),
        }
    }
}

/// Initializes the structured logging system
///
/// `RUST_LOG` overrides the configured level when set. Calling this twice is
/// a no-op.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    let result = if config.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };
    result.map_err(|e| LoggingError::Initialization(e.to_string()))?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}
