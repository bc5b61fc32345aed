//! Relay behavior configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Longest socket write timeout accepted.
const MAX_WRITE_TIMEOUT_MS: u64 = 60_000;

/// Smallest inbound message limit accepted; a join frame must fit.
const MIN_MESSAGE_BYTES: usize = 1024;

/// Relay configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    /// Upper bound on a single socket write, in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Outbound frames buffered per connection before deliveries fail
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,

    /// Largest inbound WebSocket message, in bytes
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Only accept 16-character lowercase hex room ids
    #[serde(default)]
    pub require_hex_room_ids: bool,
}

impl RelayConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.write_timeout_ms == 0 || self.write_timeout_ms > MAX_WRITE_TIMEOUT_MS {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.send_queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.max_message_bytes < MIN_MESSAGE_BYTES {
            return Err(ValidationError::MessageLimitTooSmall(MIN_MESSAGE_BYTES));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: default_write_timeout_ms(),
            send_queue_capacity: default_send_queue_capacity(),
            max_message_bytes: default_max_message_bytes(),
            require_hex_room_ids: false,
        }
    }
}

fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_send_queue_capacity() -> usize {
    64
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.write_timeout(), Duration::from_secs(5));
        assert_eq!(config.send_queue_capacity, 64);
        assert_eq!(config.max_message_bytes, 65536);
        assert!(!config.require_hex_room_ids);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_timeout() {
        let config = RelayConfig {
            write_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RelayConfig {
            write_timeout_ms: 120_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_queue() {
        let config = RelayConfig {
            send_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidQueueCapacity)
        ));
    }

    #[test]
    fn test_validation_tiny_message_limit() {
        let config = RelayConfig {
            max_message_bytes: 16,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MessageLimitTooSmall(1024))
        ));
    }
}
