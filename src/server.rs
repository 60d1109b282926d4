//! HTTP server for the Prometheus exposition endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 9205).into(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// HTTP server exposing the collector output in Prometheus text format.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: Registry,
}

impl MetricsServer {
    /// Creates a new metrics server for the given registry.
    pub fn new(config: MetricsServerConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/", get(index_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.registry);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the /metrics endpoint.
///
/// Gathering runs the collector, which performs the serverinfo request, so
/// the work is moved off the async workers.
async fn metrics_handler(State(registry): State<Registry>) -> Response {
    let encoded = tokio::task::spawn_blocking(move || {
        let metric_families = registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok::<_, prometheus::Error>(buffer)
    })
    .await;

    match encoded {
        Ok(Ok(buffer)) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            buffer,
        )
            .into_response(),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Metrics task failed: {}", e),
        )
            .into_response(),
    }
}

/// Handler for the landing page.
async fn index_handler() -> Html<&'static str> {
    Html(
        "<html>\
         <head><title>Nextcloud Exporter</title></head>\
         <body>\
         <h1>Nextcloud Exporter</h1>\
         <p><a href=\"/metrics\">Metrics</a></p>\
         </body>\
         </html>",
    )
}
