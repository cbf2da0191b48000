//! Unit-carrying scalar types.
//!
//! Daily and annual load are distinct types so a daily value can never be
//! passed where an annual one is expected (or vice versa) without an
//! explicit conversion.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ensure_non_negative};

/// Days per year used for every daily/annual conversion.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Energy consumption over one day (kWh/day, finite, >= 0).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DailyLoadKwh(f64);

impl DailyLoadKwh {
    /// Creates a daily load.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `kwh` is negative or not finite.
    pub fn new(kwh: f64) -> Result<Self, ForecastError> {
        ensure_non_negative("daily_load_kwh", kwh).map(Self)
    }

    /// Raw value in kWh/day.
    pub fn kwh(self) -> f64 {
        self.0
    }

    /// Annual equivalent (`daily × 365`).
    pub fn to_annual(self) -> AnnualLoadKwh {
        AnnualLoadKwh(self.0 * DAYS_PER_YEAR)
    }
}

impl TryFrom<f64> for DailyLoadKwh {
    type Error = ForecastError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DailyLoadKwh> for f64 {
    fn from(value: DailyLoadKwh) -> Self {
        value.0
    }
}

/// Energy consumption over one year (kWh/year, finite, >= 0).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct AnnualLoadKwh(f64);

impl AnnualLoadKwh {
    /// Creates an annual load.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `kwh` is negative or not finite.
    pub fn new(kwh: f64) -> Result<Self, ForecastError> {
        ensure_non_negative("annual_load_kwh", kwh).map(Self)
    }

    /// Raw value in kWh/year.
    pub fn kwh(self) -> f64 {
        self.0
    }

    /// Average daily equivalent (`annual / 365`).
    pub fn to_daily(self) -> DailyLoadKwh {
        DailyLoadKwh(self.0 / DAYS_PER_YEAR)
    }
}

impl TryFrom<f64> for AnnualLoadKwh {
    type Error = ForecastError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnnualLoadKwh> for f64 {
    fn from(value: AnnualLoadKwh) -> Self {
        value.0
    }
}

/// Discount rate stored as a fraction in `[0, 1]`.
///
/// Accepted as a percentage at the boundary and converted exactly once.
///
/// # Examples
///
/// ```
/// use pv_forecast::units::DiscountRate;
///
/// let r = DiscountRate::from_percent(8.0).unwrap();
/// assert_eq!(r.fraction(), 0.08);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscountRate {
    fraction: f64,
}

impl DiscountRate {
    /// Zero discounting: discounted flows equal nominal flows.
    pub const ZERO: Self = Self { fraction: 0.0 };

    /// Converts a percentage (e.g. `8.0` for 8 %) into a rate.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `percent` is in `[0, 100]`.
    pub fn from_percent(percent: f64) -> Result<Self, ForecastError> {
        if (0.0..=100.0).contains(&percent) {
            Ok(Self {
                fraction: percent / 100.0,
            })
        } else {
            Err(ForecastError::invalid(
                "discount_rate_percent",
                format!("must be in [0, 100], got {percent}"),
            ))
        }
    }

    /// Rate as a fraction (`0.08` for 8 %).
    pub fn fraction(self) -> f64 {
        self.fraction
    }

    /// Rate as a percentage.
    pub fn percent(self) -> f64 {
        self.fraction * 100.0
    }
}

/// Rounds `value` to `decimals` places (half away from zero).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_to_annual() {
        let daily = DailyLoadKwh::new(850.0).expect("valid load");
        assert_eq!(daily.to_annual().kwh(), 310_250.0);
    }

    #[test]
    fn annual_to_daily() {
        let annual = AnnualLoadKwh::new(36_500.0).expect("valid load");
        assert_eq!(annual.to_daily().kwh(), 100.0);
    }

    #[test]
    fn negative_load_rejected() {
        assert!(DailyLoadKwh::new(-1.0).is_err());
        assert!(AnnualLoadKwh::new(f64::NAN).is_err());
    }

    #[test]
    fn zero_load_is_valid() {
        assert!(DailyLoadKwh::new(0.0).is_ok());
    }

    #[test]
    fn discount_rate_bounds() {
        assert!(DiscountRate::from_percent(-0.5).is_err());
        assert!(DiscountRate::from_percent(100.5).is_err());
        assert!(DiscountRate::from_percent(f64::NAN).is_err());
        assert_eq!(
            DiscountRate::from_percent(0.0).map(DiscountRate::fraction),
            Ok(0.0)
        );
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(212.499, 2), 212.5);
        assert_eq!(round_to(590.277_777, 1), 590.3);
        assert_eq!(round_to(119.446, 2), 119.45);
    }

    #[test]
    fn load_deserializes_with_validation() {
        let ok: Result<DailyLoadKwh, _> = toml::from_str::<Wrapper>("v = 12.5").map(|w| w.v);
        assert_eq!(ok.map(DailyLoadKwh::kwh).ok(), Some(12.5));
        assert!(toml::from_str::<Wrapper>("v = -3.0").is_err());
    }

    #[derive(Deserialize)]
    struct Wrapper {
        v: DailyLoadKwh,
    }
}
