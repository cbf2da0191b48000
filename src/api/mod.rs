//! REST API for running forecasts.
//!
//! Provides two endpoints:
//! - `POST /forecast` runs a JSON scenario body
//! - `GET /presets/{name}` runs a built-in preset

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::predictor::PredictorSet;

pub use types::{ErrorResponse, ForecastResponse};

/// Application state shared across all request handlers.
///
/// Predictors are loaded lazily on first use and then shared by every
/// request; model paths in request bodies are ignored.
pub struct AppState {
    /// Model overrides applied to every forecast.
    pub predictors: PredictorSet,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/forecast", post(handlers::post_forecast))
        .route("/presets/{name}", get(handlers::get_preset))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
