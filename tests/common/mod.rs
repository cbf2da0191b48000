//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use pv_forecast::calc::TechnoEconomicInputs;
use pv_forecast::forecast::ForecastRequest;
use pv_forecast::units::{AnnualLoadKwh, DailyLoadKwh};

/// Commercial site: 850 kWh/day, 120 kW peak, 5.0 kWh/m²/day, tariff 65, 10%.
pub fn commercial_request() -> ForecastRequest {
    ForecastRequest {
        daily_load: daily(850.0),
        peak_demand_kw: 120.0,
        irradiance_kwh_m2_day: 5.0,
        tariff: 65.0,
        discount_rate_percent: 10.0,
        lifetime_years: 25,
        pv_degradation: 0.007,
        grid_emissions_factor_kg_per_kwh: 0.55,
    }
}

/// Cash-flow inputs with default lifetime and degradation.
pub fn inputs(tariff: f64, capex: f64, opex: f64, rate_pct: f64) -> TechnoEconomicInputs {
    TechnoEconomicInputs::new(tariff, capex, opex, rate_pct, 5.0).expect("valid inputs")
}

pub fn daily(kwh: f64) -> DailyLoadKwh {
    DailyLoadKwh::new(kwh).expect("valid daily load")
}

pub fn annual(kwh: f64) -> AnnualLoadKwh {
    AnnualLoadKwh::new(kwh).expect("valid annual load")
}

/// Path to a file under `scenarios/`, relative to the crate root.
pub fn scenario(name: &str) -> String {
    format!("{}/scenarios/{name}", env!("CARGO_MANIFEST_DIR"))
}
