use crate::units::{DAYS_PER_YEAR, DailyLoadKwh, round_to};

use super::losses::expected_annual_yield_kwh;

pub use super::losses::SYSTEM_EFFICIENCY as DEFAULT_SYSTEM_EFFICIENCY;

/// Performance ratio (%): actual delivered energy over expected yield.
///
/// Returns a defined `0.0` when expected yield is zero (an unsized
/// array), never NaN. Result is rounded to 2 decimals.
///
/// # Arguments
///
/// * `pv_size_kw` - Array capacity (kW)
/// * `irradiance_kwh_m2_day` - Mean daily irradiance
/// * `daily_load` - Energy actually served per day
/// * `system_efficiency` - Loss factor applied to nameplate yield
pub fn performance_ratio(
    pv_size_kw: f64,
    irradiance_kwh_m2_day: f64,
    daily_load: DailyLoadKwh,
    system_efficiency: f64,
) -> f64 {
    let expected_kwh = expected_annual_yield_kwh(pv_size_kw, irradiance_kwh_m2_day, system_efficiency);
    let actual_kwh = daily_load.kwh() * DAYS_PER_YEAR;

    if expected_kwh == 0.0 || !expected_kwh.is_finite() {
        return 0.0;
    }
    round_to(actual_kwh / expected_kwh * 100.0, 2)
}
