//! Techno-economic forecasting for PV-plus-battery installations.

#[cfg(feature = "api")]
pub mod api;
/// Sizing, cash-flow, LCOE, carbon and performance calculators.
pub mod calc;
pub mod config;
pub mod error;
pub mod forecast;
pub mod io;
pub mod load_profile;
/// Optional model-based overrides for selected outputs.
pub mod predictor;
pub mod report;
pub mod units;
