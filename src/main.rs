//! Signaling relay entry point.
//!
//! Loads configuration, initializes logging and serves until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use signaling_relay::adapters::RelayServer;
use signaling_relay::application::RoomRegistry;
use signaling_relay::config::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("signaling-relay: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.bind_addr(),
        static_dir = %config.server.static_dir,
        "Signaling relay starting"
    );

    let server = Arc::new(RelayServer::new(config, Arc::new(RoomRegistry::new())));

    tokio::spawn({
        let server = server.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => server.stop(),
                Err(e) => tracing::warn!("Unable to listen for Ctrl-C: {}", e),
            }
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initializes tracing-subscriber; `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
