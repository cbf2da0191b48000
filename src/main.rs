//! PV forecast entry point: CLI wiring and config-driven engine construction.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pv_forecast::calc::CashFlowProjection;
use pv_forecast::config::ScenarioConfig;
use pv_forecast::io::export::export_cashflow_csv;
use pv_forecast::load_profile::LoadProfile;
use pv_forecast::report::executive_summary;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<PathBuf>,
    preset: Option<String>,
    load_profile: Option<PathBuf>,
    cashflow_out: Option<PathBuf>,
    summary: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("pv-forecast: PV-plus-battery techno-economic forecast");
    eprintln!();
    eprintln!("Usage: pv-forecast [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --load-profile <path>    Derive daily load and peak demand from a CSV");
    eprintln!("  --cashflow-out <path>    Export the yearly cash-flow projection to CSV");
    eprintln!("  --summary                Print the executive summary");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        load_profile: None,
        cashflow_out: None,
        summary: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(PathBuf::from(value(&args, &mut i, "a path"))),
            "--preset" => cli.preset = Some(value(&args, &mut i, "a name").to_string()),
            "--load-profile" => {
                cli.load_profile = Some(PathBuf::from(value(&args, &mut i, "a path")));
            }
            "--cashflow-out" => {
                cli.cashflow_out = Some(PathBuf::from(value(&args, &mut i, "a path")));
            }
            "--summary" => cli.summary = true,
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                let raw = value(&args, &mut i, "a u16");
                if let Ok(p) = raw.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{raw}\" is not a valid u16");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Returns the argument following the flag at `i`, advancing `i`.
fn value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("error: {flag} requires {what} argument");
            process::exit(1);
        }
    }
}

fn load_config(cli: &CliArgs) -> anyhow::Result<ScenarioConfig> {
    let mut cfg = match (&cli.scenario_path, &cli.preset) {
        (Some(_), Some(_)) => bail!("--scenario and --preset are mutually exclusive"),
        (Some(path), None) => ScenarioConfig::from_toml_file(path)?,
        (None, Some(name)) => ScenarioConfig::from_preset(name)?,
        (None, None) => ScenarioConfig::baseline(),
    };

    if let Some(path) = &cli.load_profile {
        let profile = LoadProfile::from_csv_path(path)
            .with_context(|| format!("reading load profile \"{}\"", path.display()))?;
        cfg.apply_load_profile(&profile)?;
        info!(
            samples = profile.len(),
            dropped = profile.dropped_rows(),
            daily_load_kwh = cfg.site.daily_load_kwh,
            peak_demand_kw = cfg.site.peak_demand_kw,
            "applied load profile"
        );
    }

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("{} configuration error(s)", errors.len());
    }
    Ok(cfg)
}

fn run(cli: &CliArgs) -> anyhow::Result<()> {
    let cfg = load_config(cli)?;
    let request = cfg.to_request()?;
    let result = cfg.engine(cfg.predictor_set()).run(&request)?;

    print!("{result}");
    if cli.summary {
        println!();
        println!("{}", executive_summary(&result, request.tariff));
    }

    if let Some(path) = &cli.cashflow_out {
        write_cashflow(&result.cashflow, path)?;
    }

    #[cfg(feature = "api")]
    {
        if cli.serve {
            serve(&cfg, cli.port)?;
        }
    }

    Ok(())
}

fn write_cashflow(projection: &CashFlowProjection, path: &Path) -> anyhow::Result<()> {
    export_cashflow_csv(projection, path)
        .with_context(|| format!("writing cash-flow CSV \"{}\"", path.display()))?;
    info!(path = %path.display(), years = projection.years.len(), "exported cash flow");
    Ok(())
}

#[cfg(feature = "api")]
fn serve(cfg: &ScenarioConfig, port: u16) -> anyhow::Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use pv_forecast::api::AppState;

    let state = Arc::new(AppState {
        predictors: cfg.predictor_set(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let rt = tokio::runtime::Runtime::new().context("starting async runtime")?;
    rt.block_on(pv_forecast::api::serve(state, addr))
        .with_context(|| format!("serving API on {addr}"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
