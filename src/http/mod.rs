//! REST API over the ledger service.
//!
//! Paths keep their trailing slash. Errors are JSON objects with a single
//! `detail` field.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::LedgerService;

pub use error::ApiError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
    /// Recorded as `created_by` on records created through the API
    pub operator: Option<String>,
}

impl AppState {
    pub fn new(service: LedgerService, operator: Option<String>) -> Self {
        Self {
            service: Arc::new(service),
            operator,
        }
    }
}

/// Settings for `serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Origins allowed by CORS; empty allows any origin
    pub allowed_origins: Vec<String>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route("/bases/", get(list_bases))
        .route("/asset-types/", get(list_asset_types))
        .route("/dashboard/", get(dashboard))
        .route("/purchases/", get(list_purchases).post(create_purchase))
        .route("/purchases/:id/", get(get_purchase))
        .route("/transfers/", get(list_transfers).post(create_transfer))
        .route("/transfers/:id/", get(get_transfer))
        .route("/assignments/", get(list_assignments).post(create_assignment))
        .route("/assignments/:id/", get(get_assignment))
        .route(
            "/expenditures/",
            get(list_expenditures).post(create_expenditure),
        )
        .route("/expenditures/:id/", get(get_expenditure))
        .route("/audit-log/", get(audit_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", o))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Serve the API until Ctrl-C.
pub async fn serve(state: AppState, config: ServerConfig) -> Result<()> {
    let app = router(state).layer(cors_layer(&config.allowed_origins)?);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.addr))?;

    info!(addr = %config.addr, "Serving ledger API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
