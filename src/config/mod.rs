//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SIGNALING_RELAY` prefix and nested values use double underscores as separators.
//! Every value has a default, so the relay starts with an empty environment.
//!
//! # Example
//!
//! ```no_run
//! use signaling_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.bind_addr());
//! ```

mod error;
mod logging;
mod relay;
mod server;

pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use relay::RelayConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Plain port variable honored by container platforms.
const PORT_ENV: &str = "PORT";

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Server configuration (host, port, static assets)
    #[serde(default)]
    pub server: ServerConfig,

    /// Relay configuration (queues, timeouts, room id policy)
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration (filter, output format)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SIGNALING_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Applies a plain `PORT` variable over `server.port` when set
    /// 5. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SIGNALING_RELAY__SERVER__PORT=9000` -> `server.port = 9000`
    /// - `SIGNALING_RELAY__RELAY__WRITE_TIMEOUT_MS=2000` -> `relay.write_timeout_ms = 2000`
    /// - `PORT=9000` -> `server.port = 9000`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SIGNALING_RELAY")
                    .separator("__"),
            )
            .set_override_option("server.port", std::env::var(PORT_ENV).ok())?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first section that is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.relay.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
