use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ensure_non_negative, ensure_positive, ensure_unit_fraction};
use crate::units::{DailyLoadKwh, round_to};

/// Battery and derating assumptions used by [`size_system`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingParams {
    /// Days the battery must carry the night-time load (> 0).
    pub autonomy_days: f64,
    /// Share of daily load consumed outside daylight hours, in (0, 1].
    pub night_fraction: f64,
    /// Usable fraction of nominal battery capacity, in (0, 1].
    pub depth_of_discharge: f64,
    /// Battery round-trip efficiency, in (0, 1].
    pub battery_efficiency: f64,
    /// Aggregate inverter/wiring/temperature derating, in (0, 1].
    pub derating_factor: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            autonomy_days: 1.0,
            night_fraction: 0.5,
            depth_of_discharge: 0.8,
            battery_efficiency: 0.9,
            derating_factor: 0.8,
        }
    }
}

impl SizingParams {
    fn validate(&self) -> Result<(), ForecastError> {
        ensure_positive("autonomy_days", self.autonomy_days)?;
        ensure_unit_fraction("night_fraction", self.night_fraction)?;
        ensure_unit_fraction("depth_of_discharge", self.depth_of_discharge)?;
        ensure_unit_fraction("battery_efficiency", self.battery_efficiency)?;
        ensure_unit_fraction("derating_factor", self.derating_factor)?;
        Ok(())
    }
}

/// Recommended equipment sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingResult {
    /// PV array capacity (kW), 2 decimals, never below peak demand.
    pub pv_kw: f64,
    /// Battery capacity (kWh), 1 decimal.
    pub battery_kwh: f64,
}

/// Sizes the PV array and battery for a daily load.
///
/// The array covers the derated daily energy at the given irradiance but
/// is floor-clamped to `peak_demand_kw` so it can always meet peak
/// instantaneous demand. The battery stores the night-time share of the
/// load for `autonomy_days`, grossed up for depth of discharge and
/// round-trip losses.
///
/// # Arguments
///
/// * `daily_load` - Daily consumption
/// * `peak_demand_kw` - Peak instantaneous demand (kW, >= 0)
/// * `irradiance_kwh_m2_day` - Mean daily irradiance (peak-sun-hours, > 0)
/// * `params` - Battery and derating assumptions
///
/// # Errors
///
/// Returns `InvalidInput` for non-positive irradiance, negative peak
/// demand, or any fraction outside (0, 1].
///
/// # Examples
///
/// ```
/// use pv_forecast::calc::{SizingParams, size_system};
/// use pv_forecast::units::DailyLoadKwh;
///
/// let load = DailyLoadKwh::new(850.0).unwrap();
/// let sized = size_system(load, 120.0, 5.0, &SizingParams::default()).unwrap();
/// assert_eq!(sized.pv_kw, 212.5);
/// assert_eq!(sized.battery_kwh, 590.3);
/// ```
pub fn size_system(
    daily_load: DailyLoadKwh,
    peak_demand_kw: f64,
    irradiance_kwh_m2_day: f64,
    params: &SizingParams,
) -> Result<SizingResult, ForecastError> {
    ensure_positive("irradiance_kwh_m2_day", irradiance_kwh_m2_day)?;
    ensure_non_negative("peak_demand_kw", peak_demand_kw)?;
    params.validate()?;

    let required_daily_generation = daily_load.kwh() / params.derating_factor;
    // Clamp after rounding: the floor must hold exactly.
    let pv_kw =
        round_to(required_daily_generation / irradiance_kwh_m2_day, 2).max(peak_demand_kw);

    let usable_energy = daily_load.kwh() * params.night_fraction * params.autonomy_days;
    let battery_kwh = usable_energy / (params.depth_of_discharge * params.battery_efficiency);

    Ok(SizingResult {
        pv_kw,
        battery_kwh: round_to(battery_kwh, 1),
    })
}
