//! API response types.

use serde::Serialize;

use crate::forecast::ForecastResult;

/// Forecast plus its narrative summary.
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub result: ForecastResult,
    /// Executive summary against the request's tariff.
    pub summary: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error description.
    pub error: String,
}
