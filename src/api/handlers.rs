//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::debug;

use super::AppState;
use super::types::{ErrorResponse, ForecastResponse};
use crate::config::ScenarioConfig;
use crate::report::executive_summary;

type ApiResult = Result<Json<ForecastResponse>, (StatusCode, Json<ErrorResponse>)>;

/// Runs a forecast for the posted scenario.
///
/// `POST /forecast` → 200 + `ForecastResponse` JSON
/// invalid scenario or input → 400 + `ErrorResponse`
pub async fn post_forecast(
    State(state): State<Arc<AppState>>,
    Json(cfg): Json<ScenarioConfig>,
) -> ApiResult {
    run(&state, &cfg)
}

/// Runs a forecast for a built-in preset.
///
/// `GET /presets/{name}` → 200 + `ForecastResponse` JSON
/// unknown preset → 404 + `ErrorResponse`
pub async fn get_preset(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult {
    let cfg = ScenarioConfig::from_preset(&name).map_err(|e| error(StatusCode::NOT_FOUND, e))?;
    run(&state, &cfg)
}

fn run(state: &AppState, cfg: &ScenarioConfig) -> ApiResult {
    let errors = cfg.validate();
    if !errors.is_empty() {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(error(StatusCode::BAD_REQUEST, message));
    }

    let request = cfg
        .to_request()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    let result = cfg
        .engine(state.predictors.clone())
        .run(&request)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    debug!(pv_kw = result.sizing.pv_kw, "forecast served");

    let summary = executive_summary(&result, request.tariff);
    Ok(Json(ForecastResponse { result, summary }))
}

fn error(status: StatusCode, e: impl ToString) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}
