//! config-rs/lib.rs
//! Shared configuration utilities for the prompt gateway workspace
//! Provides standardized functions for port/address and environment management

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Port used when neither `PORT` nor a service-specific override is set
pub const DEFAULT_PORT: u16 = 5000;

/// Errors raised while reading required configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingVar(String),

    #[error("{0} environment variable is empty")]
    EmptyVar(String),

    #[error("Failed to load .env file: {0}")]
    Dotenv(String),
}

/// Load a `.env` file from the working directory or one of its parents
///
/// Runs before logging is set up, so the outcome is returned for the caller
/// to report. A missing file yields `Ok(None)`.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    dotenv_outcome(dotenv::dotenv())
}

fn dotenv_outcome(result: dotenv::Result<PathBuf>) -> Result<Option<PathBuf>, ConfigError> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

fn service_var(service_name: &str, suffix: &str) -> String {
    format!(
        "{}_{}",
        service_name.to_uppercase().replace('-', "_"),
        suffix
    )
}

fn parse_port(var_name: &str, value: &str, default_port: u16) -> u16 {
    value.trim().parse::<u16>().unwrap_or_else(|_| {
        log::warn!("Invalid port in {}, using default {}", var_name, default_port);
        default_port
    })
}

/// Get service port from environment variables with proper fallback
///
/// `PORT` takes precedence (the convention used by most hosting platforms),
/// then `<SERVICE>_SERVICE_PORT`, then `default_port`.
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "prompt-gateway")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    if let Ok(value) = env::var("PORT") {
        return parse_port("PORT", &value, default_port);
    }

    let var_name = service_var(service_name, "SERVICE_PORT");
    match env::var(&var_name) {
        Ok(value) => parse_port(&var_name, &value, default_port),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// `<SERVICE>_SERVICE_ADDR` may carry a full `host:port` or
/// `http(s)://host:port` override; otherwise the service binds on all
/// interfaces at the resolved port.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = service_var(service_name, "SERVICE_ADDR");

    if let Ok(addr_str) = env::var(&var_name) {
        let candidate = addr_str
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&addr_str)
            .trim_end_matches('/');

        match candidate.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Read an environment variable, falling back to `default` when unset or blank
pub fn get_env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read an environment variable that must be present and non-empty
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::EmptyVar(key.to_string())),
        Ok(value) => Ok(value),
        Err(_) => Err(ConfigError::MissingVar(key.to_string())),
    }
}

/// Standardized per-service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    service_name: String,
}

impl ServiceConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn get_service_port(&self, default_port: u16) -> u16 {
        get_service_port(&self.service_name, default_port)
    }

    pub fn get_bind_address(&self, port: u16) -> SocketAddr {
        get_bind_address(&self.service_name, port)
    }
}
