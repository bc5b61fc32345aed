//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid write timeout (must be 1..=60000 ms)")]
    InvalidTimeout,

    #[error("Send queue capacity must be at least 1")]
    InvalidQueueCapacity,

    #[error("Max message size must be at least {0} bytes")]
    MessageLimitTooSmall(usize),

    #[error("Unknown log format '{0}' (expected 'text' or 'json')")]
    InvalidLogFormat(String),
}
