mod common;

use pv_forecast::calc::{
    CarbonParams, Payback, SizingParams, carbon_reduction, project_savings, size_system,
};
use pv_forecast::config::ScenarioConfig;
use pv_forecast::forecast::{ForecastEngine, Provenance};

use common::{annual, commercial_request, daily, inputs};

#[test]
fn commercial_cashflow_pays_back_in_first_year() {
    let p = project_savings(annual(310_250.0), &inputs(65.0, 2_000_000.0, 20_000.0, 10.0))
        .expect("valid projection");

    assert_eq!(p.years.len(), 25);
    assert_eq!(p.years[0].net_savings, 20_146_250.0);
    assert_eq!(p.payback, Payback::Year(1));
    assert!(p.total_savings > 400_000_000.0);
    assert!(p.npv > 0.0);
}

#[test]
fn commercial_sizing() {
    let s = size_system(daily(850.0), 120.0, 5.0, &SizingParams::default()).expect("valid");
    assert_eq!(s.pv_kw, 212.5);
    assert!((s.battery_kwh - 590.3).abs() < 1e-9);
}

#[test]
fn commercial_carbon_reduction() {
    let c = carbon_reduction(annual(310_250.0), 0.55, &CarbonParams::default()).expect("valid");
    assert!((c.annual_tons - 119.45).abs() < 0.011);
    assert!((c.lifetime_tons - 2986.16).abs() < 0.011);
}

#[test]
fn zero_irradiance_sizing_is_rejected() {
    let err = size_system(daily(850.0), 120.0, 0.0, &SizingParams::default());
    assert_eq!(err.map_err(|e| e.field()), Err("irradiance_kwh_m2_day"));
}

#[test]
fn commercial_preset_matches_calculators() {
    let result = ScenarioConfig::commercial()
        .forecast()
        .expect("commercial preset is valid");

    assert_eq!(result.sizing.pv_kw, 212.5);
    assert_eq!(result.capex, 2_000_000.0);
    assert_eq!(result.opex_annual, 20_000.0);
    assert_eq!(result.cashflow.payback, Payback::Year(1));
    assert_eq!(result.performance_ratio, 94.12);
    assert!((result.carbon.annual_tons - 119.45).abs() < 0.011);
}

#[test]
fn baseline_preset_derives_costs_from_pv_size() {
    let result = ScenarioConfig::baseline()
        .forecast()
        .expect("baseline preset is valid");

    // 120 / (5.2 * 0.8) = 28.846... > 25 kW peak
    assert_eq!(result.sizing.pv_kw, 28.85);
    assert_eq!(result.capex, 28.85 * 400_000.0);
    assert_eq!(result.opex_annual, result.capex * 0.01);
    assert!(result.lcoe > 0.0);
}

#[test]
fn scenario_files_match_presets() {
    for name in ScenarioConfig::PRESETS {
        let path = common::scenario(&format!("{name}.toml"));
        let from_file =
            ScenarioConfig::from_toml_file(std::path::Path::new(&path)).expect("scenario parses");
        let preset = ScenarioConfig::from_preset(name).expect("known preset");
        assert_eq!(
            from_file.forecast().expect("valid"),
            preset.forecast().expect("valid"),
            "scenarios/{name}.toml should match the built-in preset"
        );
    }
}

#[test]
fn shipped_models_override_co2_and_lcoe() {
    let path = common::scenario("commercial_models.toml");
    let cfg = ScenarioConfig::from_toml_file(std::path::Path::new(&path)).expect("parses");
    let result = cfg.forecast().expect("valid scenario");

    assert_eq!(result.provenance.co2, Provenance::Model);
    assert_eq!(result.provenance.lcoe, Provenance::Model);
    assert_eq!(result.provenance.pv_kw, Provenance::Formula);
    assert!((result.carbon.annual_tons - 124.1).abs() < 1e-9);
    assert!((result.carbon.lifetime_tons - 3102.5).abs() < 1e-9);
    assert!((result.lcoe - 45.0).abs() < 1e-9);

    // Savings never come from a model.
    let formula = ScenarioConfig::commercial().forecast().expect("valid");
    assert_eq!(result.cashflow, formula.cashflow);
}

#[test]
fn engine_output_is_reproducible() {
    let engine = ForecastEngine::deterministic();
    let req = commercial_request();
    let first = engine.run(&req).expect("valid");
    for _ in 0..5 {
        assert_eq!(engine.run(&req).expect("valid"), first);
    }
}
