//! Human-readable rendering of a forecast.

use std::fmt;
use std::fmt::Write as _;

use crate::forecast::{ForecastResult, Provenance};

/// Performance ratio (%) below which the array is flagged as underperforming.
pub const PERFORMANCE_RATIO_THRESHOLD: f64 = 70.0;

/// Payback (years) above which the investment is flagged as slow to return.
pub const PAYBACK_THRESHOLD_YEARS: f64 = 15.0;

impl fmt::Display for ForecastResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Forecast Report ---")?;
        writeln!(
            f,
            "PV size: {:.2} kW{}",
            self.sizing.pv_kw,
            tag(self.provenance.pv_kw)
        )?;
        writeln!(f, "Battery storage: {:.1} kWh", self.sizing.battery_kwh)?;
        writeln!(f, "Performance ratio: {:.2}%", self.performance_ratio)?;
        writeln!(f, "CAPEX: {}", thousands(self.capex))?;
        writeln!(f, "Annual OPEX: {}", thousands(self.opex_annual))?;
        writeln!(
            f,
            "Total {}-year savings: {}",
            self.cashflow.years.len(),
            thousands(self.cashflow.total_savings)
        )?;
        writeln!(f, "NPV: {}", thousands(self.cashflow.npv))?;
        writeln!(f, "Payback: {}", self.cashflow.payback)?;
        writeln!(f, "LCOE: {:.2}/kWh{}", self.lcoe, tag(self.provenance.lcoe))?;
        writeln!(
            f,
            "CO2 avoided: {:.2} t/yr, {:.2} t lifetime{}",
            self.carbon.annual_tons,
            self.carbon.lifetime_tons,
            tag(self.provenance.co2)
        )
    }
}

fn tag(source: Provenance) -> &'static str {
    match source {
        Provenance::Formula => "",
        Provenance::Model => " (model)",
    }
}

/// Rounds to a whole number and groups digits in threes.
fn thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One-paragraph narrative of the forecast for a non-technical reader.
///
/// Compares the result against fixed thresholds: performance ratio
/// against [`PERFORMANCE_RATIO_THRESHOLD`], payback against
/// [`PAYBACK_THRESHOLD_YEARS`], LCOE against `tariff`, and lifetime
/// savings against capex.
pub fn executive_summary(result: &ForecastResult, tariff: f64) -> String {
    let mut s = String::new();
    let pr = result.performance_ratio;
    let lifetime = result.cashflow.years.len();

    // Writing into a String cannot fail.
    let _ = write!(
        s,
        "The recommended PV system is {:.1} kW with {:.1} kWh of battery storage. ",
        result.sizing.pv_kw, result.sizing.battery_kwh
    );

    if pr < PERFORMANCE_RATIO_THRESHOLD {
        let _ = write!(
            s,
            "The performance ratio of {pr:.1}% is below optimal; review panel orientation, \
             soiling, or panel efficiency. "
        );
    } else {
        let _ = write!(s, "The system performs efficiently with a performance ratio of {pr:.1}%. ");
    }

    let _ = write!(
        s,
        "The initial investment is {} with annual OPEX of {}. ",
        thousands(result.capex),
        thousands(result.opex_annual)
    );

    let payback = result.cashflow.payback;
    if payback.is_never() {
        let _ = write!(
            s,
            "The investment does not pay back within {lifetime} years; consider reducing CAPEX \
             or exploring incentives. "
        );
    } else if payback.years() > PAYBACK_THRESHOLD_YEARS {
        let _ = write!(
            s,
            "The payback period of {payback} is relatively long; consider reducing CAPEX or \
             exploring incentives. "
        );
    } else {
        let _ = write!(
            s,
            "The payback period of {payback} indicates a reasonable return on investment. "
        );
    }

    if result.lcoe > tariff {
        let _ = write!(
            s,
            "The LCOE of {:.2}/kWh exceeds the grid tariff of {tariff:.2}/kWh, so PV energy may \
             cost more than grid energy. ",
            result.lcoe
        );
    } else {
        let _ = write!(
            s,
            "The LCOE of {:.2}/kWh is at or below the grid tariff of {tariff:.2}/kWh, making the \
             system economically favorable. ",
            result.lcoe
        );
    }

    let _ = write!(
        s,
        "The system avoids {:.2} t of CO2 per year and {:.2} t over its lifetime. ",
        result.carbon.annual_tons, result.carbon.lifetime_tons
    );

    let total = result.cashflow.total_savings;
    if total < result.capex {
        let _ = write!(
            s,
            "Projected {lifetime}-year savings of {} fall short of the initial CAPEX.",
            thousands(total)
        );
    } else {
        let _ = write!(
            s,
            "Projected {lifetime}-year savings of {} exceed the initial investment.",
            thousands(total)
        );
    }

    s
}
