use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ensure_non_negative};
use crate::units::{AnnualLoadKwh, round_to};

/// Policy assumptions for [`carbon_reduction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarbonParams {
    /// Share of consumption assumed to be served by PV instead of the grid.
    ///
    /// A fixed policy constant, not derived from load matching against
    /// the PV generation profile.
    pub offset_fraction: f64,
    /// Years over which lifetime avoided emissions are accumulated.
    pub lifetime_years: u32,
}

impl Default for CarbonParams {
    fn default() -> Self {
        Self {
            offset_fraction: 0.7,
            lifetime_years: 25,
        }
    }
}

/// Avoided grid emissions (tonnes CO₂e), rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarbonReduction {
    pub annual_tons: f64,
    pub lifetime_tons: f64,
}

impl CarbonReduction {
    /// Builds a reduction from an annual figure, extending it over
    /// `lifetime_years` and rounding both values.
    pub fn from_annual_tons(annual_tons: f64, lifetime_years: u32) -> Self {
        Self {
            annual_tons: round_to(annual_tons, 2),
            lifetime_tons: round_to(annual_tons * f64::from(lifetime_years), 2),
        }
    }
}

/// Emissions avoided by serving `offset_fraction` of the load from PV.
///
/// `annual = load × factor × offset / 1000`; `lifetime = annual × years`,
/// with the lifetime figure computed from the unrounded annual value.
///
/// # Errors
///
/// Returns `InvalidInput` for a negative emissions factor or an offset
/// fraction outside `[0, 1]`.
pub fn carbon_reduction(
    annual_load: AnnualLoadKwh,
    grid_emissions_factor_kg_per_kwh: f64,
    params: &CarbonParams,
) -> Result<CarbonReduction, ForecastError> {
    ensure_non_negative(
        "grid_emissions_factor_kg_per_kwh",
        grid_emissions_factor_kg_per_kwh,
    )?;
    if !(0.0..=1.0).contains(&params.offset_fraction) {
        return Err(ForecastError::invalid(
            "offset_fraction",
            format!("must be in [0, 1], got {}", params.offset_fraction),
        ));
    }

    let annual_tons =
        annual_load.kwh() * grid_emissions_factor_kg_per_kwh * params.offset_fraction / 1000.0;
    Ok(CarbonReduction::from_annual_tons(
        annual_tons,
        params.lifetime_years,
    ))
}
