//! HTTP API server for the preview service

pub mod health;
pub mod preview;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::DEFAULT_PORT;
use crate::preview::PreviewService;

/// Shared state for API handlers
pub struct ApiState {
    pub service: Arc<PreviewService>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    service: Arc<PreviewService>,
    port: u16,
    cors_origins: Vec<String>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(service: Arc<PreviewService>) -> Self {
        Self {
            service,
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
        }
    }

    /// Set the listening port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the origins allowed to make cross-origin requests
    #[must_use]
    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        ApiServer {
            state: Arc::new(ApiState {
                service: self.service,
            }),
            port: self.port,
            cors_origins: self.cors_origins,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    cors_origins: Vec<String>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api", preview::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()))
            .layer(cors_layer(&self.cors_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, origins = ?self.cors_origins, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// GET-only CORS for the configured front-end origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
}
