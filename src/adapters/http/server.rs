//! RelayServer - HTTP/WebSocket front door and lifecycle.
//!
//! Owns the listener, composes the routes and carries the shutdown signal
//! shared by axum's graceful shutdown and every WebSocket read loop.

use std::io;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::adapters::websocket::{websocket_router, ConnectionSettings, WebSocketState};
use crate::application::{RoomRegistry, SignalingRouter};
use crate::config::AppConfig;

use super::diagnostics::diagnostics_router;

/// Errors that end [`RelayServer::run`].
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The accept loop failed.
    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

/// The signaling relay server.
///
/// # Example
///
/// ```ignore
/// let server = Arc::new(RelayServer::new(config, Arc::new(RoomRegistry::new())));
/// let handle = tokio::spawn({
///     let server = server.clone();
///     async move { server.run().await }
/// });
/// server.stop();
/// handle.await??;
/// ```
pub struct RelayServer {
    config: AppConfig,
    registry: Arc<RoomRegistry>,
    shutdown: watch::Sender<bool>,
}

impl RelayServer {
    pub fn new(config: AppConfig, registry: Arc<RoomRegistry>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            registry,
            shutdown,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Bind the configured address and serve until [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// - [`ServerError::Bind`] if the address cannot be bound
    /// - [`ServerError::Serve`] if the accept loop fails
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`stop`](Self::stop).
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(addr = %local_addr, "Signaling relay listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(stopped(self.shutdown.subscribe()))
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!(addr = %local_addr, "Signaling relay stopped");
        Ok(())
    }

    /// Ask the server and every open connection to wind down.
    ///
    /// Connections finish the message they are handling, leave their rooms
    /// and close. Calling this more than once has no further effect.
    pub fn stop(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Shutdown requested");
        }
    }

    pub fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Build the application router.
    ///
    /// # Routes
    ///
    /// - `GET /ws` - signaling WebSocket
    /// - `GET /rooms` - registry snapshot
    /// - `GET /health` - liveness probe
    /// - anything else - static files from `server.static_dir`
    pub fn router(&self) -> Router {
        let signaling = SignalingRouter::new(self.registry.clone())
            .with_hex_room_ids(self.config.relay.require_hex_room_ids);
        let ws_state = WebSocketState::new(
            Arc::new(signaling),
            ConnectionSettings::from(&self.config.relay),
            self.shutdown.subscribe(),
        );

        Router::new()
            .merge(websocket_router().with_state(ws_state))
            .merge(diagnostics_router().with_state(self.registry.clone()))
            .fallback_service(ServeDir::new(&self.config.server.static_dir))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }
}

/// Resolves once the shutdown flag is raised or its sender is gone.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    loop {
        let stopping = *shutdown.borrow_and_update();
        if stopping || shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server_with_static(dir: &std::path::Path) -> RelayServer {
        let mut config = AppConfig::default();
        config.server.static_dir = dir.to_string_lossy().into_owned();
        RelayServer::new(config, Arc::new(RoomRegistry::new()))
    }

    #[test]
    fn stop_is_idempotent() {
        let server = RelayServer::new(AppConfig::default(), Arc::new(RoomRegistry::new()));
        assert!(!server.is_stopping());

        server.stop();
        server.stop();

        assert!(server.is_stopping());
    }

    #[tokio::test]
    async fn serves_static_files_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>relay</h1>").unwrap();
        let server = server_with_static(dir.path());

        let response = server
            .router()
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>relay</h1>");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_static(dir.path());

        let response = server
            .router()
            .oneshot(Request::builder().uri("/missing.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let server = RelayServer::new(AppConfig::default(), Arc::new(RoomRegistry::new()));

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        let server = RelayServer::new(config, Arc::new(RoomRegistry::new()));

        let result = server.run().await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn serve_returns_after_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Arc::new(RelayServer::new(
            AppConfig::default(),
            Arc::new(RoomRegistry::new()),
        ));

        let handle = tokio::spawn({
            let server = server.clone();
            async move { server.serve(listener).await }
        });
        server.stop();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
