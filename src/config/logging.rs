//! Logging configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: `text` or `json`
    #[serde(default = "default_format")]
    pub format: String,
}

impl LoggingConfig {
    /// Whether log lines should be emitted as JSON
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.format.to_ascii_lowercase().as_str() {
            "text" | "json" => Ok(()),
            _ => Err(ValidationError::InvalidLogFormat(self.format.clone())),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info,signaling_relay=debug".to_string()
}

fn default_format() -> String {
    "text".to_string()
}
