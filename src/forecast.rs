//! Composition of the calculators into one forecast.
//!
//! Control flow: size the system, derive costs from the PV size through
//! [`CostPolicy`], then project savings, LCOE, carbon reduction and
//! performance ratio. Optional predictors may replace the PV size, the
//! annual CO₂ figure, or the LCOE; any predictor failure falls back to
//! the formula for that output only.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calc::losses::SYSTEM_EFFICIENCY;
use crate::calc::{
    CarbonParams, CarbonReduction, CashFlowProjection, SizingParams, SizingResult,
    TechnoEconomicInputs, carbon_reduction, levelized_cost, performance_ratio, project_savings,
    size_system,
};
use crate::error::{ForecastError, ensure_non_negative};
use crate::predictor::{FeatureInput, FeatureVector, PredictorSet, Target};
use crate::units::{DailyLoadKwh, round_to};

/// Site and tariff inputs for one forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRequest {
    pub daily_load: DailyLoadKwh,
    /// Peak instantaneous demand (kW).
    pub peak_demand_kw: f64,
    /// Mean daily irradiance (kWh/m²/day).
    pub irradiance_kwh_m2_day: f64,
    /// Grid tariff (currency/kWh).
    pub tariff: f64,
    /// Discount rate as a percentage.
    pub discount_rate_percent: f64,
    pub lifetime_years: u32,
    /// Annual PV output decline (fraction/year).
    pub pv_degradation: f64,
    /// Grid carbon intensity (kg CO₂e/kWh).
    pub grid_emissions_factor_kg_per_kwh: f64,
}

/// Policy turning a PV size into capital and operating costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostPolicy {
    /// Installed cost per kW of PV (currency/kW).
    pub capex_per_kw: f64,
    /// Annual operating cost as a fraction of capex.
    pub opex_fraction: f64,
    /// Upper bound on annual operating cost as a fraction of capex.
    pub max_opex_fraction: f64,
    /// Optional cap on PV size per MWh of annual load. Disabled when
    /// `None`; when enabled it may size the array below peak demand.
    pub max_pv_kw_per_mwh: Option<f64>,
    /// Fixed capex replacing the per-kW derivation.
    pub capex_override: Option<f64>,
    /// Fixed annual opex replacing the fractional derivation.
    pub opex_override: Option<f64>,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            capex_per_kw: 400_000.0,
            opex_fraction: 0.01,
            max_opex_fraction: 0.05,
            max_pv_kw_per_mwh: None,
            capex_override: None,
            opex_override: None,
        }
    }
}

impl CostPolicy {
    /// Capital cost for an array of `pv_kw`.
    pub fn capex_for(&self, pv_kw: f64) -> f64 {
        self.capex_override
            .unwrap_or(pv_kw * self.capex_per_kw)
            .max(0.0)
    }

    /// Annual operating cost for a given capex.
    pub fn opex_for(&self, capex: f64) -> f64 {
        self.opex_override
            .unwrap_or_else(|| (capex * self.opex_fraction).min(capex * self.max_opex_fraction))
    }

    fn validate(&self) -> Result<(), ForecastError> {
        ensure_non_negative("capex_per_kw", self.capex_per_kw)?;
        ensure_non_negative("opex_fraction", self.opex_fraction)?;
        ensure_non_negative("max_opex_fraction", self.max_opex_fraction)?;
        if let Some(cap) = self.max_pv_kw_per_mwh {
            ensure_non_negative("max_pv_kw_per_mwh", cap)?;
        }
        if let Some(capex) = self.capex_override {
            ensure_non_negative("capex", capex)?;
        }
        if let Some(opex) = self.opex_override {
            ensure_non_negative("opex_annual", opex)?;
        }
        Ok(())
    }
}

/// Where an output value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Formula,
    Model,
}

/// Provenance of each output a predictor may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputProvenance {
    pub pv_kw: Provenance,
    pub co2: Provenance,
    pub lcoe: Provenance,
}

/// Complete forecast for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub sizing: SizingResult,
    pub capex: f64,
    pub opex_annual: f64,
    pub cashflow: CashFlowProjection,
    /// Levelized cost of energy (currency/kWh).
    pub lcoe: f64,
    pub carbon: CarbonReduction,
    /// Performance ratio (%).
    pub performance_ratio: f64,
    pub provenance: OutputProvenance,
}

/// Runs forecasts with fixed assumptions and injected predictors.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    sizing: SizingParams,
    costs: CostPolicy,
    offset_fraction: f64,
    predictors: PredictorSet,
}

impl ForecastEngine {
    /// Creates an engine.
    ///
    /// # Arguments
    ///
    /// * `sizing` - Battery and derating assumptions
    /// * `costs` - Capex/opex derivation policy
    /// * `offset_fraction` - Share of load assumed served by PV for carbon
    /// * `predictors` - Optional model overrides
    pub fn new(
        sizing: SizingParams,
        costs: CostPolicy,
        offset_fraction: f64,
        predictors: PredictorSet,
    ) -> Self {
        Self {
            sizing,
            costs,
            offset_fraction,
            predictors,
        }
    }

    /// Engine with default assumptions and no predictors.
    pub fn deterministic() -> Self {
        Self::new(
            SizingParams::default(),
            CostPolicy::default(),
            CarbonParams::default().offset_fraction,
            PredictorSet::none(),
        )
    }

    pub fn predictors(&self) -> &PredictorSet {
        &self.predictors
    }

    /// Produces a forecast.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` from the first calculator whose
    /// precondition fails. Predictor failures are never returned.
    pub fn run(&self, req: &ForecastRequest) -> Result<ForecastResult, ForecastError> {
        self.costs.validate()?;
        // Validated before any predictor is consulted.
        ensure_non_negative(
            "grid_emissions_factor_kg_per_kwh",
            req.grid_emissions_factor_kg_per_kwh,
        )?;
        if !(0.0..=1.0).contains(&self.offset_fraction) {
            return Err(ForecastError::invalid(
                "offset_fraction",
                format!("must be in [0, 1], got {}", self.offset_fraction),
            ));
        }
        let annual_load = req.daily_load.to_annual();

        let mut sizing = size_system(
            req.daily_load,
            req.peak_demand_kw,
            req.irradiance_kwh_m2_day,
            &self.sizing,
        )?;
        debug!(pv_kw = sizing.pv_kw, battery_kwh = sizing.battery_kwh, "sized system");

        let capacity_features = FeatureVector::new()
            .with(FeatureInput::DailyLoadKwh, req.daily_load.kwh())
            .with(FeatureInput::AnnualLoadKwh, annual_load.kwh())
            .with(FeatureInput::PeakDemandKw, req.peak_demand_kw)
            .with(FeatureInput::IrradianceKwhM2Day, req.irradiance_kwh_m2_day);
        let pv_source = match self.consult(Target::Capacity, &capacity_features, |kw| kw > 0.0) {
            Some(kw) => {
                sizing.pv_kw = round_to(kw, 2).max(req.peak_demand_kw);
                Provenance::Model
            }
            None => Provenance::Formula,
        };

        if let Some(per_mwh) = self.costs.max_pv_kw_per_mwh {
            let cap_kw = annual_load.kwh() / 1000.0 * per_mwh;
            if cap_kw > 0.0 && sizing.pv_kw > cap_kw {
                debug!(from = sizing.pv_kw, to = cap_kw, "PV size capped by cost policy");
                // Floored so the stored size never exceeds the cap.
                sizing.pv_kw = (cap_kw * 100.0).floor() / 100.0;
            }
        }

        let capex = self.costs.capex_for(sizing.pv_kw);
        let opex_annual = self.costs.opex_for(capex);
        debug!(capex, opex_annual, "derived costs");

        let inputs = TechnoEconomicInputs::new(
            req.tariff,
            capex,
            opex_annual,
            req.discount_rate_percent,
            req.irradiance_kwh_m2_day,
        )?
        .with_lifetime_years(req.lifetime_years)?
        .with_pv_degradation(req.pv_degradation)?;

        let cashflow = project_savings(annual_load, &inputs)?;
        debug!(
            total_savings = cashflow.total_savings,
            npv = cashflow.npv,
            payback = %cashflow.payback,
            "projected savings"
        );

        let lcoe_features = FeatureVector::new()
            .with(FeatureInput::Capex, capex)
            .with(FeatureInput::OpexAnnual, opex_annual)
            .with(FeatureInput::IrradianceKwhM2Day, req.irradiance_kwh_m2_day)
            .with(FeatureInput::PvKw, sizing.pv_kw);
        let (lcoe, lcoe_source) = match self.consult(Target::Lcoe, &lcoe_features, |v| v >= 0.0) {
            Some(v) => (v, Provenance::Model),
            None => (
                levelized_cost(
                    capex,
                    opex_annual,
                    req.irradiance_kwh_m2_day,
                    req.lifetime_years,
                    // An unsized array is costed per kW.
                    (sizing.pv_kw > 0.0).then_some(sizing.pv_kw),
                )?,
                Provenance::Formula,
            ),
        };

        let co2_features = FeatureVector::new()
            .with(FeatureInput::AnnualLoadKwh, annual_load.kwh())
            .with(FeatureInput::DailyLoadKwh, req.daily_load.kwh())
            .with(FeatureInput::PeakDemandKw, req.peak_demand_kw);
        let (carbon, co2_source) = match self.consult(Target::Co2, &co2_features, |t| t >= 0.0) {
            Some(tons) => (
                CarbonReduction::from_annual_tons(tons, req.lifetime_years),
                Provenance::Model,
            ),
            None => (
                carbon_reduction(
                    annual_load,
                    req.grid_emissions_factor_kg_per_kwh,
                    &CarbonParams {
                        offset_fraction: self.offset_fraction,
                        lifetime_years: req.lifetime_years,
                    },
                )?,
                Provenance::Formula,
            ),
        };

        let performance_ratio = performance_ratio(
            sizing.pv_kw,
            req.irradiance_kwh_m2_day,
            req.daily_load,
            SYSTEM_EFFICIENCY,
        );

        Ok(ForecastResult {
            sizing,
            capex,
            opex_annual,
            cashflow,
            lcoe,
            carbon,
            performance_ratio,
            provenance: OutputProvenance {
                pv_kw: pv_source,
                co2: co2_source,
                lcoe: lcoe_source,
            },
        })
    }

    /// Asks the predictor for `target`, returning `None` when there is no
    /// predictor, it is unavailable, or its value fails `usable`.
    fn consult(
        &self,
        target: Target,
        features: &FeatureVector,
        usable: impl Fn(f64) -> bool,
    ) -> Option<f64> {
        let predictor = self.predictors.get(target)?;
        match predictor.predict(features) {
            Ok(v) if v.is_finite() && usable(v) => {
                debug!(target_output = %target, value = v, "using model prediction");
                Some(v)
            }
            Ok(v) => {
                warn!(
                    target_output = %target,
                    value = v,
                    "model prediction unusable, falling back to formula"
                );
                None
            }
            Err(e) => {
                warn!(
                    target_output = %target,
                    reason = %e.reason,
                    "predictor unavailable, falling back to formula"
                );
                None
            }
        }
    }
}
