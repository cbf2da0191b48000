use std::fmt;

use serde::Serialize;

use crate::error::{ForecastError, ensure_non_negative, ensure_positive};
use crate::units::{AnnualLoadKwh, DiscountRate};

/// Default analysis horizon (years).
pub const DEFAULT_LIFETIME_YEARS: u32 = 25;

/// Longest accepted analysis horizon (years).
pub const MAX_LIFETIME_YEARS: u32 = 100;

/// Default annual PV output decline (fraction/year).
pub const DEFAULT_PV_DEGRADATION: f64 = 0.007;

/// Immutable bundle of tariff, cost and discounting assumptions.
///
/// Constructed through [`TechnoEconomicInputs::new`], which validates
/// every field, so a value of this type always satisfies the calculator
/// preconditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnoEconomicInputs {
    tariff: f64,
    capex: f64,
    opex_annual: f64,
    discount_rate: DiscountRate,
    irradiance_kwh_m2_day: f64,
    lifetime_years: u32,
    pv_degradation: f64,
}

impl TechnoEconomicInputs {
    /// Creates inputs with the default 25-year lifetime and 0.7 %/year
    /// degradation.
    ///
    /// # Arguments
    ///
    /// * `tariff` - Grid tariff (currency/kWh, >= 0)
    /// * `capex` - Installation cost (currency, >= 0)
    /// * `opex_annual` - Operating cost (currency/year, >= 0)
    /// * `discount_rate_percent` - Discount rate as a percentage, 0-100
    /// * `irradiance_kwh_m2_day` - Mean daily irradiance (> 0)
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first field out of range.
    pub fn new(
        tariff: f64,
        capex: f64,
        opex_annual: f64,
        discount_rate_percent: f64,
        irradiance_kwh_m2_day: f64,
    ) -> Result<Self, ForecastError> {
        Ok(Self {
            tariff: ensure_non_negative("tariff", tariff)?,
            capex: ensure_non_negative("capex", capex)?,
            opex_annual: ensure_non_negative("opex_annual", opex_annual)?,
            discount_rate: DiscountRate::from_percent(discount_rate_percent)?,
            irradiance_kwh_m2_day: ensure_positive("irradiance_kwh_m2_day", irradiance_kwh_m2_day)?,
            lifetime_years: DEFAULT_LIFETIME_YEARS,
            pv_degradation: DEFAULT_PV_DEGRADATION,
        })
    }

    /// Replaces the analysis horizon.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `years` is in `1..=MAX_LIFETIME_YEARS`.
    pub fn with_lifetime_years(mut self, years: u32) -> Result<Self, ForecastError> {
        ensure_lifetime(years)?;
        self.lifetime_years = years;
        Ok(self)
    }

    /// Replaces the annual PV degradation rate.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `rate` is in `[0, 1)`.
    pub fn with_pv_degradation(mut self, rate: f64) -> Result<Self, ForecastError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(ForecastError::invalid(
                "pv_degradation",
                format!("must be in [0, 1), got {rate}"),
            ));
        }
        self.pv_degradation = rate;
        Ok(self)
    }

    pub fn tariff(&self) -> f64 {
        self.tariff
    }

    pub fn capex(&self) -> f64 {
        self.capex
    }

    pub fn opex_annual(&self) -> f64 {
        self.opex_annual
    }

    pub fn discount_rate(&self) -> DiscountRate {
        self.discount_rate
    }

    pub fn irradiance_kwh_m2_day(&self) -> f64 {
        self.irradiance_kwh_m2_day
    }

    pub fn lifetime_years(&self) -> u32 {
        self.lifetime_years
    }

    pub fn pv_degradation(&self) -> f64 {
        self.pv_degradation
    }
}

/// Checks that `years` is in `1..=MAX_LIFETIME_YEARS`.
pub(crate) fn ensure_lifetime(years: u32) -> Result<u32, ForecastError> {
    if (1..=MAX_LIFETIME_YEARS).contains(&years) {
        Ok(years)
    } else {
        Err(ForecastError::invalid(
            "lifetime_years",
            format!("must be in [1, {MAX_LIFETIME_YEARS}], got {years}"),
        ))
    }
}

/// First year the capex-inclusive running total turns strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payback {
    /// 1-based year of the first crossing.
    Year(u32),
    /// No crossing within the analysis horizon.
    Never,
}

impl Payback {
    /// Payback as a number of years, `f64::INFINITY` for [`Payback::Never`].
    pub fn years(self) -> f64 {
        match self {
            Self::Year(y) => f64::from(y),
            Self::Never => f64::INFINITY,
        }
    }

    pub fn is_never(self) -> bool {
        matches!(self, Self::Never)
    }
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(1) => write!(f, "1 year"),
            Self::Year(y) => write!(f, "{y} years"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// One year of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyCashFlow {
    /// 1-based year index.
    pub year: u32,
    /// `(1 - degradation)^(year - 1)`.
    pub degradation_factor: f64,
    /// Avoided grid cost before operating expenses.
    pub gross_savings: f64,
    /// `gross_savings - opex_annual`; may be negative.
    pub net_savings: f64,
    /// `net_savings / (1 + r)^year`.
    pub discounted: f64,
    /// Sum of `net_savings` up to and including this year.
    pub cumulative_savings: f64,
    /// Running total from `-capex` plus each net saving so far.
    pub cumulative_cashflow: f64,
}

/// Year-by-year cash-flow projection over the system lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowProjection {
    /// One entry per year, in order.
    pub years: Vec<YearlyCashFlow>,
    /// Undiscounted sum of net savings.
    pub total_savings: f64,
    /// First year of positive capex-inclusive cumulative cash flow.
    pub payback: Payback,
    /// Sum of discounted net savings minus capex.
    pub npv: f64,
    /// Upfront cost the projection was computed against.
    pub capex: f64,
}

impl CashFlowProjection {
    /// Net cash flow for each year.
    pub fn net_cashflows(&self) -> Vec<f64> {
        self.years.iter().map(|y| y.net_savings).collect()
    }

    /// Running sum of net cash flow (capex excluded).
    pub fn cumulative_savings(&self) -> Vec<f64> {
        self.years.iter().map(|y| y.cumulative_savings).collect()
    }

    /// Capex-inclusive cumulative cash flow at the end of `year`
    /// (`-capex` for year 0), or `None` past the horizon.
    pub fn cumulative_cashflow_at(&self, year: u32) -> Option<f64> {
        if year == 0 {
            return Some(-self.capex);
        }
        self.years
            .get(year as usize - 1)
            .map(|y| y.cumulative_cashflow)
    }
}

/// Projects discounted savings over the system lifetime.
///
/// PV output decays geometrically from year 1 (no degradation in year 1).
/// Summation is strictly sequential from year 1 to N so results are
/// bit-reproducible. A negative net year is reported as-is.
///
/// # Errors
///
/// Currently infallible for validated inputs; the `Result` keeps the
/// calculator signatures uniform.
///
/// # Examples
///
/// ```
/// use pv_forecast::calc::{Payback, TechnoEconomicInputs, project_savings};
/// use pv_forecast::units::AnnualLoadKwh;
///
/// let inputs = TechnoEconomicInputs::new(65.0, 2_000_000.0, 20_000.0, 10.0, 5.0).unwrap();
/// let load = AnnualLoadKwh::new(310_250.0).unwrap();
/// let p = project_savings(load, &inputs).unwrap();
/// assert_eq!(p.years[0].net_savings, 20_146_250.0);
/// assert_eq!(p.payback, Payback::Year(1));
/// ```
pub fn project_savings(
    annual_load: AnnualLoadKwh,
    inputs: &TechnoEconomicInputs,
) -> Result<CashFlowProjection, ForecastError> {
    let r = inputs.discount_rate.fraction();
    let base_annual_savings = annual_load.kwh() * inputs.tariff;
    let retained = 1.0 - inputs.pv_degradation;

    let mut years = Vec::with_capacity(inputs.lifetime_years as usize);
    let mut cumulative_savings = 0.0_f64;
    let mut running = -inputs.capex;
    let mut discounted_sum = 0.0_f64;
    let mut payback = Payback::Never;

    for year in 1..=inputs.lifetime_years {
        let exponent = i32::try_from(year).map_err(|_| {
            ForecastError::invalid("lifetime_years", format!("{year} exceeds supported horizon"))
        })?;
        let degradation_factor = retained.powi(exponent - 1);
        let gross_savings = base_annual_savings * degradation_factor;
        let net_savings = gross_savings - inputs.opex_annual;
        let discounted = net_savings / (1.0 + r).powi(exponent);

        cumulative_savings += net_savings;
        running += net_savings;
        discounted_sum += discounted;
        let cumulative_cashflow = running;

        if payback.is_never() && cumulative_cashflow > 0.0 {
            payback = Payback::Year(year);
        }

        years.push(YearlyCashFlow {
            year,
            degradation_factor,
            gross_savings,
            net_savings,
            discounted,
            cumulative_savings,
            cumulative_cashflow,
        });
    }

    Ok(CashFlowProjection {
        years,
        total_savings: cumulative_savings,
        payback,
        npv: discounted_sum - inputs.capex,
        capex: inputs.capex,
    })
}
