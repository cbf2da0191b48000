//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::calc::SizingParams;
use crate::calc::savings::{DEFAULT_LIFETIME_YEARS, DEFAULT_PV_DEGRADATION, MAX_LIFETIME_YEARS};
use crate::error::ForecastError;
use crate::forecast::{CostPolicy, ForecastEngine, ForecastRequest, ForecastResult};
use crate::load_profile::LoadProfile;
use crate::predictor::{LazyPredictor, PredictorSet, Target};
use crate::units::DailyLoadKwh;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Consumption and solar resource at the site.
    #[serde(default)]
    pub site: SiteConfig,
    /// Tariff and discounting assumptions.
    #[serde(default)]
    pub finance: FinanceConfig,
    /// Capital and operating cost policy.
    #[serde(default)]
    pub costs: CostPolicy,
    /// Battery and derating assumptions.
    #[serde(default)]
    pub sizing: SizingParams,
    /// Grid emissions assumptions.
    #[serde(default)]
    pub carbon: CarbonConfig,
    /// Optional model artifacts.
    #[serde(default)]
    pub predictor: PredictorConfig,
}

/// Consumption and solar resource at the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Average daily consumption (kWh/day, >= 0).
    pub daily_load_kwh: f64,
    /// Peak instantaneous demand (kW, >= 0).
    pub peak_demand_kw: f64,
    /// Mean daily irradiance (kWh/m²/day, > 0).
    pub irradiance_kwh_m2_day: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            daily_load_kwh: 120.0,
            peak_demand_kw: 25.0,
            irradiance_kwh_m2_day: 5.2,
        }
    }
}

/// Tariff and discounting assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceConfig {
    /// Grid tariff (currency/kWh).
    pub tariff: f64,
    /// Discount rate as a percentage (0-100).
    pub discount_rate_percent: f64,
    /// Projection horizon (years, 1-100).
    pub lifetime_years: u32,
    /// Annual PV output decline (fraction/year, 0.0-1.0 exclusive).
    pub pv_degradation: f64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            tariff: 120.0,
            discount_rate_percent: 8.0,
            lifetime_years: DEFAULT_LIFETIME_YEARS,
            pv_degradation: DEFAULT_PV_DEGRADATION,
        }
    }
}

/// Grid emissions assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarbonConfig {
    /// Grid carbon intensity (kg CO₂e/kWh).
    pub grid_emissions_factor_kg_per_kwh: f64,
    /// Share of load assumed served by PV (0.0-1.0).
    pub offset_fraction: f64,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            grid_emissions_factor_kg_per_kwh: 0.55,
            offset_fraction: 0.7,
        }
    }
}

/// Paths to model artifacts. Absent paths mean the formula is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictorConfig {
    pub capacity_model: Option<PathBuf>,
    pub co2_model: Option<PathBuf>,
    pub lcoe_model: Option<PathBuf>,
}

impl PredictorConfig {
    fn paths(&self) -> [(Target, Option<&PathBuf>); 3] {
        [
            (Target::Capacity, self.capacity_model.as_ref()),
            (Target::Co2, self.co2_model.as_ref()),
            (Target::Lcoe, self.lcoe_model.as_ref()),
        ]
    }

    /// Rewrites relative artifact paths against `base`.
    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.capacity_model,
            &mut self.co2_model,
            &mut self.lcoe_model,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"site.irradiance_kwh_m2_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ScenarioConfig {
    /// Returns the baseline scenario: a small site on default assumptions.
    pub fn baseline() -> Self {
        Self {
            site: SiteConfig::default(),
            finance: FinanceConfig::default(),
            costs: CostPolicy::default(),
            sizing: SizingParams::default(),
            carbon: CarbonConfig::default(),
            predictor: PredictorConfig::default(),
        }
    }

    /// Returns the commercial preset: large site with fixed project costs.
    pub fn commercial() -> Self {
        Self {
            site: SiteConfig {
                daily_load_kwh: 850.0,
                peak_demand_kw: 120.0,
                irradiance_kwh_m2_day: 5.0,
            },
            finance: FinanceConfig {
                tariff: 65.0,
                discount_rate_percent: 10.0,
                ..FinanceConfig::default()
            },
            costs: CostPolicy {
                capex_override: Some(2_000_000.0),
                opex_override: Some(20_000.0),
                ..CostPolicy::default()
            },
            sizing: SizingParams::default(),
            carbon: CarbonConfig::default(),
            predictor: PredictorConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "commercial"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "commercial" => Ok(Self::commercial()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// Relative model artifact paths are resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            cfg.predictor.resolve_relative_to(dir);
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Replaces the site's daily load and peak demand with values derived
    /// from a metered profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the profile has no usable samples.
    pub fn apply_load_profile(&mut self, profile: &LoadProfile) -> Result<(), ConfigError> {
        match (profile.daily_load(), profile.peak_load_kw()) {
            (Some(daily), Some(peak)) => {
                self.site.daily_load_kwh = daily.kwh();
                self.site.peak_demand_kw = peak;
                Ok(())
            }
            _ => Err(ConfigError {
                field: "load_profile".into(),
                message: "contains no usable samples".into(),
            }),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError {
                    field: field.into(),
                    message: message.into(),
                });
            }
        };

        let site = &self.site;
        check(
            non_negative(site.daily_load_kwh),
            "site.daily_load_kwh",
            "must be >= 0",
        );
        check(
            non_negative(site.peak_demand_kw),
            "site.peak_demand_kw",
            "must be >= 0",
        );
        check(
            site.irradiance_kwh_m2_day.is_finite() && site.irradiance_kwh_m2_day > 0.0,
            "site.irradiance_kwh_m2_day",
            "must be > 0",
        );

        let fin = &self.finance;
        check(non_negative(fin.tariff), "finance.tariff", "must be >= 0");
        check(
            (0.0..=100.0).contains(&fin.discount_rate_percent),
            "finance.discount_rate_percent",
            "must be in [0, 100]",
        );
        check(
            (1..=MAX_LIFETIME_YEARS).contains(&fin.lifetime_years),
            "finance.lifetime_years",
            "must be in [1, 100]",
        );
        check(
            (0.0..1.0).contains(&fin.pv_degradation),
            "finance.pv_degradation",
            "must be in [0.0, 1.0)",
        );

        let costs = &self.costs;
        check(
            non_negative(costs.capex_per_kw),
            "costs.capex_per_kw",
            "must be >= 0",
        );
        check(
            non_negative(costs.opex_fraction),
            "costs.opex_fraction",
            "must be >= 0",
        );
        check(
            non_negative(costs.max_opex_fraction),
            "costs.max_opex_fraction",
            "must be >= 0",
        );
        check(
            costs.max_pv_kw_per_mwh.is_none_or(|v| v.is_finite() && v > 0.0),
            "costs.max_pv_kw_per_mwh",
            "must be > 0 when set",
        );
        check(
            costs.capex_override.is_none_or(non_negative),
            "costs.capex_override",
            "must be >= 0 when set",
        );
        check(
            costs.opex_override.is_none_or(non_negative),
            "costs.opex_override",
            "must be >= 0 when set",
        );

        let sz = &self.sizing;
        check(
            sz.autonomy_days.is_finite() && sz.autonomy_days > 0.0,
            "sizing.autonomy_days",
            "must be > 0",
        );
        for (value, field) in [
            (sz.night_fraction, "sizing.night_fraction"),
            (sz.depth_of_discharge, "sizing.depth_of_discharge"),
            (sz.battery_efficiency, "sizing.battery_efficiency"),
            (sz.derating_factor, "sizing.derating_factor"),
        ] {
            check(value > 0.0 && value <= 1.0, field, "must be in (0.0, 1.0]");
        }

        let carbon = &self.carbon;
        check(
            non_negative(carbon.grid_emissions_factor_kg_per_kwh),
            "carbon.grid_emissions_factor_kg_per_kwh",
            "must be >= 0",
        );
        check(
            (0.0..=1.0).contains(&carbon.offset_fraction),
            "carbon.offset_fraction",
            "must be in [0.0, 1.0]",
        );

        errors
    }

    /// Builds the per-run request from the site and finance sections.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the daily load is negative or not finite.
    pub fn to_request(&self) -> Result<ForecastRequest, ForecastError> {
        Ok(ForecastRequest {
            daily_load: DailyLoadKwh::new(self.site.daily_load_kwh)?,
            peak_demand_kw: self.site.peak_demand_kw,
            irradiance_kwh_m2_day: self.site.irradiance_kwh_m2_day,
            tariff: self.finance.tariff,
            discount_rate_percent: self.finance.discount_rate_percent,
            lifetime_years: self.finance.lifetime_years,
            pv_degradation: self.finance.pv_degradation,
            grid_emissions_factor_kg_per_kwh: self.carbon.grid_emissions_factor_kg_per_kwh,
        })
    }

    /// One lazily loaded predictor per configured artifact path.
    ///
    /// Nothing is read from disk until the first forecast asks for a
    /// prediction.
    pub fn predictor_set(&self) -> PredictorSet {
        self.predictor
            .paths()
            .into_iter()
            .fold(PredictorSet::none(), |set, (target, path)| match path {
                Some(path) => set.with(target, Arc::new(LazyPredictor::new(path, target))),
                None => set,
            })
    }

    /// Engine carrying this scenario's assumptions and the given predictors.
    pub fn engine(&self, predictors: PredictorSet) -> ForecastEngine {
        ForecastEngine::new(
            self.sizing.clone(),
            self.costs.clone(),
            self.carbon.offset_fraction,
            predictors,
        )
    }

    /// Runs the scenario with its own configured predictors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` from the first failing calculator.
    pub fn forecast(&self) -> Result<ForecastResult, ForecastError> {
        self.engine(self.predictor_set()).run(&self.to_request()?)
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
