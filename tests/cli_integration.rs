mod common;

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pv-forecast"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("pv-forecast process should run")
}

fn stdout_of(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout should be valid UTF-8")
}

/// Extracts the value after `label` on its report line.
fn field<'a>(report: &'a str, label: &str) -> &'a str {
    report
        .lines()
        .find_map(|l| l.strip_prefix(label))
        .unwrap_or_else(|| panic!("report missing \"{label}\":\n{report}"))
        .trim()
}

#[test]
fn presets_produce_distinct_reports() {
    let baseline = stdout_of(&["--preset", "baseline"]);
    let commercial = stdout_of(&["--preset", "commercial"]);

    assert_eq!(field(&commercial, "PV size:"), "212.50 kW");
    assert_eq!(field(&commercial, "CAPEX:"), "2,000,000");
    assert_eq!(field(&commercial, "Payback:"), "1 year");
    assert_eq!(field(&baseline, "PV size:"), "28.85 kW");
    assert_ne!(baseline, commercial);
}

#[test]
fn default_run_is_baseline() {
    assert_eq!(stdout_of(&[]), stdout_of(&["--preset", "baseline"]));
}

#[test]
fn scenario_file_matches_preset() {
    let path = common::scenario("commercial.toml");
    assert_eq!(
        stdout_of(&["--scenario", &path]),
        stdout_of(&["--preset", "commercial"])
    );
}

#[test]
fn summary_is_appended() {
    let out = stdout_of(&["--preset", "commercial", "--summary"]);
    assert!(out.contains("reasonable return on investment"));
}

#[test]
fn load_profile_replaces_site_load() {
    let path = common::scenario("load_profiles/site_hourly.csv");
    let out = stdout_of(&["--preset", "baseline", "--load-profile", &path]);
    // 61 kWh/day: 61 / (5.2 * 0.8) = 14.66 kW, above the 6 kW profile peak
    assert_eq!(field(&out, "PV size:"), "14.66 kW");
}

#[test]
fn cashflow_csv_is_written() {
    let path = std::env::temp_dir().join(format!("pv-forecast-cashflow-{}.csv", std::process::id()));
    let path_str = path.to_string_lossy().into_owned();
    stdout_of(&["--preset", "commercial", "--cashflow-out", &path_str]);

    let csv = std::fs::read_to_string(&path).expect("cash-flow CSV exists");
    std::fs::remove_file(&path).ok();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 26);
    assert!(lines[1].starts_with("1,1.000000,20166250.00,20146250.00,"));
}

#[test]
fn unknown_preset_fails() {
    let output = run(&["--preset", "nope"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"), "stderr: {stderr}");
}

#[test]
fn invalid_scenario_reports_every_field() {
    let path = std::env::temp_dir().join(format!("pv-forecast-invalid-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[site]\nirradiance_kwh_m2_day = 0.0\n\n[finance]\nlifetime_years = 0\n",
    )
    .expect("write temp scenario");
    let output = run(&["--scenario", &path.to_string_lossy()]);
    std::fs::remove_file(&path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("site.irradiance_kwh_m2_day"), "stderr: {stderr}");
    assert!(stderr.contains("finance.lifetime_years"), "stderr: {stderr}");
}
