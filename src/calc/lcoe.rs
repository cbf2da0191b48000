use crate::error::{ForecastError, ensure_non_negative, ensure_positive};

use super::losses::{SYSTEM_EFFICIENCY, expected_annual_yield_kwh};
use super::savings::ensure_lifetime;

/// Levelized cost of energy (currency/kWh).
///
/// `(capex + opex_annual × lifetime) / (annual_energy × lifetime)`, where
/// annual energy is the expected yield of `pv_kw` (1 kW when `None`) at
/// the given irradiance after [`SYSTEM_EFFICIENCY`] losses.
///
/// # Arguments
///
/// * `capex` - Installation cost (>= 0)
/// * `opex_annual` - Operating cost per year (>= 0)
/// * `irradiance_kwh_m2_day` - Mean daily irradiance (> 0)
/// * `lifetime_years` - Analysis horizon, 1 to [`MAX_LIFETIME_YEARS`](super::savings::MAX_LIFETIME_YEARS)
/// * `pv_kw` - Array size; `None` gives the cost per kWh of a 1 kW array
///
/// # Errors
///
/// Returns `InvalidInput` for negative costs, a lifetime outside the accepted horizon, or any input
/// that makes lifetime energy non-positive.
pub fn levelized_cost(
    capex: f64,
    opex_annual: f64,
    irradiance_kwh_m2_day: f64,
    lifetime_years: u32,
    pv_kw: Option<f64>,
) -> Result<f64, ForecastError> {
    ensure_non_negative("capex", capex)?;
    ensure_non_negative("opex_annual", opex_annual)?;
    ensure_positive("irradiance_kwh_m2_day", irradiance_kwh_m2_day)?;
    ensure_lifetime(lifetime_years)?;
    let pv_kw = match pv_kw {
        Some(kw) => ensure_positive("pv_kw", kw)?,
        None => 1.0,
    };

    let annual_energy = expected_annual_yield_kwh(pv_kw, irradiance_kwh_m2_day, SYSTEM_EFFICIENCY);
    let years = f64::from(lifetime_years);
    let lifetime_energy = annual_energy * years;
    if !(lifetime_energy.is_finite() && lifetime_energy > 0.0) {
        return Err(ForecastError::invalid(
            "annual_energy",
            format!("must be > 0, got {annual_energy}"),
        ));
    }

    Ok((capex + opex_annual * years) / lifetime_energy)
}
