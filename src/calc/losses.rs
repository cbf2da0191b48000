//! System loss budget shared by the yield-based calculators.

/// Combined inverter, wiring and temperature efficiency applied to
/// nameplate yield when estimating delivered energy.
///
/// Used by both the LCOE and performance-ratio calculators so the two
/// never disagree on expected generation.
pub const SYSTEM_EFFICIENCY: f64 = 0.85;

/// Expected annual PV yield (kWh/year) for an array of `pv_kw` at
/// `irradiance_kwh_m2_day` peak-sun-hours.
pub fn expected_annual_yield_kwh(pv_kw: f64, irradiance_kwh_m2_day: f64, efficiency: f64) -> f64 {
    pv_kw * irradiance_kwh_m2_day * crate::units::DAYS_PER_YEAR * efficiency
}
