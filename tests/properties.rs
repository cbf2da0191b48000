//! Randomised checks of calculator invariants over seeded inputs.

mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pv_forecast::calc::{Payback, SizingParams, TechnoEconomicInputs, project_savings, size_system};

use common::{annual, daily, inputs};

const CASES: usize = 500;

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

#[test]
fn total_savings_non_decreasing_in_tariff() {
    let mut rng = rng();
    for _ in 0..CASES {
        let load = annual(rng.random_range(0.0..1_000_000.0));
        let capex = rng.random_range(0.0..5_000_000.0);
        let opex = rng.random_range(0.0..100_000.0);
        let rate = rng.random_range(0.0..20.0);
        let t1 = rng.random_range(0.0..200.0);
        let t2 = t1 + rng.random_range(0.0..50.0);

        let low = project_savings(load, &inputs(t1, capex, opex, rate)).expect("valid");
        let high = project_savings(load, &inputs(t2, capex, opex, rate)).expect("valid");
        assert!(
            high.total_savings >= low.total_savings,
            "tariff {t1} -> {t2} lowered savings"
        );
    }
}

#[test]
fn total_savings_non_increasing_in_opex() {
    let mut rng = rng();
    for _ in 0..CASES {
        let load = annual(rng.random_range(0.0..1_000_000.0));
        let tariff = rng.random_range(0.0..200.0);
        let capex = rng.random_range(0.0..5_000_000.0);
        let rate = rng.random_range(0.0..20.0);
        let o1 = rng.random_range(0.0..100_000.0);
        let o2 = o1 + rng.random_range(0.0..50_000.0);

        let cheap = project_savings(load, &inputs(tariff, capex, o1, rate)).expect("valid");
        let costly = project_savings(load, &inputs(tariff, capex, o2, rate)).expect("valid");
        assert!(
            costly.total_savings <= cheap.total_savings,
            "opex {o1} -> {o2} raised savings"
        );
    }
}

#[test]
fn payback_year_is_first_positive_crossing() {
    let mut rng = rng();
    let mut finite = 0;
    for _ in 0..CASES {
        let load = annual(rng.random_range(1_000.0..500_000.0));
        let tariff = rng.random_range(1.0..150.0);
        let capex = rng.random_range(100_000.0..200_000_000.0);
        let opex = rng.random_range(0.0..200_000.0);
        let rate = rng.random_range(0.0..15.0);

        let p = project_savings(load, &inputs(tariff, capex, opex, rate)).expect("valid");
        match p.payback {
            Payback::Year(year) => {
                finite += 1;
                let before = p.cumulative_cashflow_at(year - 1).expect("within horizon");
                let at = p.cumulative_cashflow_at(year).expect("within horizon");
                assert!(before <= 0.0, "cumulative at year {} was {before}", year - 1);
                assert!(at > 0.0, "cumulative at payback year {year} was {at}");
            }
            Payback::Never => {
                assert!(p.years.iter().all(|y| y.cumulative_cashflow <= 0.0));
            }
        }
    }
    assert!(finite > 0, "sample should include paying-back cases");
}

#[test]
fn degradation_strictly_lowers_year_two() {
    let mut rng = rng();
    for _ in 0..CASES {
        let load = annual(rng.random_range(1.0..1_000_000.0));
        let tariff = rng.random_range(0.01..200.0);
        let degradation = rng.random_range(0.001..0.05);
        let lifetime = rng.random_range(2..=40);

        let i = TechnoEconomicInputs::new(tariff, 1_000_000.0, 10_000.0, 8.0, 5.0)
            .and_then(|i| i.with_pv_degradation(degradation))
            .and_then(|i| i.with_lifetime_years(lifetime))
            .expect("valid inputs");
        let p = project_savings(load, &i).expect("valid");
        assert!(p.years[1].gross_savings < p.years[0].gross_savings);
    }
}

/// Net flows keep one sign across the horizon: opex is either well below
/// the degraded gross savings or above the undegraded gross.
#[test]
fn positive_npv_implies_positive_total() {
    let mut rng = rng();
    for _ in 0..CASES {
        let kwh = rng.random_range(0.0..500_000.0);
        let load = annual(kwh);
        let tariff = rng.random_range(0.0..150.0);
        let gross = kwh * tariff;
        let opex = if rng.random_bool(0.5) {
            gross * rng.random_range(0.0..0.8)
        } else {
            gross * rng.random_range(1.0..1.5)
        };
        let capex = rng.random_range(0.0..50_000_000.0);
        let rate = rng.random_range(0.0..25.0);

        let p = project_savings(load, &inputs(tariff, capex, opex, rate)).expect("valid");
        if p.npv > 0.0 {
            assert!(p.total_savings > 0.0, "npv {} with total {}", p.npv, p.total_savings);
        }
    }
}

#[test]
fn sizing_never_below_peak_demand() {
    let mut rng = rng();
    let params = SizingParams::default();
    for _ in 0..CASES {
        let load = daily(rng.random_range(0.0..5_000.0));
        let peak = rng.random_range(0.0..1_000.0);
        let irradiance = rng.random_range(0.1..8.0);

        let s = size_system(load, peak, irradiance, &params).expect("valid");
        assert!(s.pv_kw >= peak, "pv {} below peak {peak}", s.pv_kw);
        assert!(s.pv_kw.is_finite() && s.battery_kwh.is_finite());
    }
}

#[test]
fn zero_irradiance_never_sizes() {
    let mut rng = rng();
    for _ in 0..50 {
        let load = daily(rng.random_range(0.0..5_000.0));
        let peak = rng.random_range(0.0..1_000.0);
        assert!(size_system(load, peak, 0.0, &SizingParams::default()).is_err());
    }
}
