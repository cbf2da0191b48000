//! Optional trained-model predictors that may override individual outputs.
//!
//! The forecast engine never depends on a predictor being present: every
//! failure here is a [`PredictorUnavailable`] that the caller turns into
//! the deterministic formula for that one output.
//!
//! Feature construction uses a static, versioned schema. Each slot is a
//! named engine input; model artifacts name their columns either by the
//! slot's canonical name or by one of its curated aliases (exact,
//! case-insensitive match). Unknown columns always receive the missing
//! marker and are imputed by the model.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Version of [`SCHEMA_V1`]; artifacts declaring another version are rejected.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Output a predictor can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// PV array size (kW).
    Capacity,
    /// Annual avoided emissions (tonnes).
    Co2,
    /// Levelized cost of energy (currency/kWh).
    Lcoe,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Capacity, Target::Co2, Target::Lcoe];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capacity => "capacity",
            Self::Co2 => "co2",
            Self::Lcoe => "lcoe",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predictor could not produce a usable value.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorUnavailable {
    pub reason: String,
}

impl PredictorUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PredictorUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "predictor unavailable: {}", self.reason)
    }
}

impl std::error::Error for PredictorUnavailable {}

/// Named engine input that can feed a feature slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureInput {
    Capex,
    OpexAnnual,
    Tariff,
    DiscountRatePercent,
    AnnualLoadKwh,
    DailyLoadKwh,
    PeakDemandKw,
    IrradianceKwhM2Day,
    PvKw,
}

/// One slot of the feature schema.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSlot {
    pub input: FeatureInput,
    /// Canonical column name.
    pub name: &'static str,
    /// Additional exact column names accepted for this slot.
    pub aliases: &'static [&'static str],
}

/// Feature schema version 1.
pub const SCHEMA_V1: &[FeatureSlot] = &[
    FeatureSlot {
        input: FeatureInput::Capex,
        name: "capex",
        aliases: &["initial cost of investment/ - C", "initial_cost"],
    },
    FeatureSlot {
        input: FeatureInput::OpexAnnual,
        name: "opex_annual",
        aliases: &["cost of maintenance= 1% of J                       K", "opex"],
    },
    FeatureSlot {
        input: FeatureInput::Tariff,
        name: "tariff",
        aliases: &["Electricity tarrif (₦)/KWh              G"],
    },
    FeatureSlot {
        input: FeatureInput::DiscountRatePercent,
        name: "discount_rate_percent",
        aliases: &["discount_rate"],
    },
    FeatureSlot {
        input: FeatureInput::AnnualLoadKwh,
        name: "annual_load_kwh",
        aliases: &["Annual energy consumption from the grid (kWh)            D"],
    },
    FeatureSlot {
        input: FeatureInput::DailyLoadKwh,
        name: "daily_load_kwh",
        aliases: &["daily_load"],
    },
    FeatureSlot {
        input: FeatureInput::PeakDemandKw,
        name: "peak_demand_kw",
        aliases: &["peak_load"],
    },
    FeatureSlot {
        input: FeatureInput::IrradianceKwhM2Day,
        name: "irradiance_kwh_m2_day",
        aliases: &["irradiance"],
    },
    FeatureSlot {
        input: FeatureInput::PvKw,
        name: "pv_kw",
        aliases: &["pv_size_kw"],
    },
];

/// Resolves an artifact column name to a schema slot.
///
/// Matching is exact after trimming and ASCII case folding; no substring
/// search is performed.
pub fn resolve_feature(column: &str) -> Option<FeatureInput> {
    let needle = column.trim();
    SCHEMA_V1
        .iter()
        .find(|slot| {
            slot.name.eq_ignore_ascii_case(needle)
                || slot
                    .aliases
                    .iter()
                    .any(|alias| alias.trim().eq_ignore_ascii_case(needle))
        })
        .map(|slot| slot.input)
}

/// Value of one feature slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Value(f64),
    /// Not available for this request; the model imputes it.
    Missing,
}

/// Feature vector keyed by schema slot.
///
/// Starts with every slot [`FeatureValue::Missing`]; callers fill the
/// slots they know.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: BTreeMap<FeatureInput, FeatureValue>,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureVector {
    pub fn new() -> Self {
        Self {
            values: SCHEMA_V1
                .iter()
                .map(|slot| (slot.input, FeatureValue::Missing))
                .collect(),
        }
    }

    /// Sets a slot; non-finite values are stored as missing.
    pub fn with(mut self, input: FeatureInput, value: f64) -> Self {
        let v = if value.is_finite() {
            FeatureValue::Value(value)
        } else {
            FeatureValue::Missing
        };
        self.values.insert(input, v);
        self
    }

    pub fn get(&self, input: FeatureInput) -> FeatureValue {
        self.values
            .get(&input)
            .copied()
            .unwrap_or(FeatureValue::Missing)
    }

    pub fn schema_version(&self) -> u32 {
        FEATURE_SCHEMA_VERSION
    }
}

/// Capability to predict one numeric output from a feature vector.
pub trait Predictor: Send + Sync {
    /// Returns the prediction, or why none could be made.
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictorUnavailable>;
}

/// Predictor that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl Predictor for Unavailable {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, PredictorUnavailable> {
        Err(PredictorUnavailable::new("no model configured"))
    }
}

/// One standardised, median-imputed linear term of a [`LinearModel`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearTerm {
    /// Column name as used when the model was trained.
    pub name: String,
    pub coefficient: f64,
    /// Training median, used when the feature is missing.
    pub median: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

/// Frozen regression artifact loaded from TOML.
///
/// ```toml
/// schema_version = 1
/// target = "lcoe"
/// intercept = 12.0
///
/// [[terms]]
/// name = "capex"
/// coefficient = 0.5
/// median = 1000000.0
/// mean = 1000000.0
/// scale = 250000.0
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearModel {
    pub schema_version: u32,
    pub target: Target,
    pub intercept: f64,
    #[serde(default)]
    pub terms: Vec<LinearTerm>,
    /// Slot each term reads from, resolved once at load.
    #[serde(skip)]
    resolved: Vec<Option<FeatureInput>>,
}

impl LinearModel {
    /// Parses and checks an artifact.
    ///
    /// # Errors
    ///
    /// Returns `PredictorUnavailable` for malformed TOML, a schema
    /// version other than [`FEATURE_SCHEMA_VERSION`], or a non-finite or
    /// zero-scale term.
    pub fn from_toml_str(s: &str) -> Result<Self, PredictorUnavailable> {
        let mut model: Self = toml::from_str(s)
            .map_err(|e| PredictorUnavailable::new(format!("invalid model artifact: {e}")))?;

        if model.schema_version != FEATURE_SCHEMA_VERSION {
            return Err(PredictorUnavailable::new(format!(
                "feature schema version {} does not match supported version {FEATURE_SCHEMA_VERSION}",
                model.schema_version
            )));
        }
        if !model.intercept.is_finite() {
            return Err(PredictorUnavailable::new("intercept must be finite"));
        }
        for term in &model.terms {
            let finite = [term.coefficient, term.median, term.mean, term.scale]
                .iter()
                .all(|v| v.is_finite());
            if !finite || term.scale == 0.0 {
                return Err(PredictorUnavailable::new(format!(
                    "term \"{}\" must have finite values and non-zero scale",
                    term.name
                )));
            }
        }

        model.resolved = model
            .terms
            .iter()
            .map(|t| resolve_feature(&t.name))
            .collect();
        Ok(model)
    }

    /// Reads and parses an artifact file.
    ///
    /// # Errors
    ///
    /// Returns `PredictorUnavailable` if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self, PredictorUnavailable> {
        let content = fs::read_to_string(path).map_err(|e| {
            PredictorUnavailable::new(format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Term names that do not map to any schema slot (always imputed).
    pub fn unmapped_terms(&self) -> Vec<&str> {
        self.terms
            .iter()
            .zip(&self.resolved)
            .filter(|(_, slot)| slot.is_none())
            .map(|(t, _)| t.name.as_str())
            .collect()
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictorUnavailable> {
        if features.schema_version() != self.schema_version {
            return Err(PredictorUnavailable::new("feature schema version mismatch"));
        }
        if self.resolved.len() != self.terms.len() {
            return Err(PredictorUnavailable::new("model terms were not resolved"));
        }

        let mut sum = self.intercept;
        for (term, slot) in self.terms.iter().zip(&self.resolved) {
            let raw = match slot.map(|s| features.get(s)) {
                Some(FeatureValue::Value(v)) => v,
                Some(FeatureValue::Missing) | None => term.median,
            };
            sum += term.coefficient * (raw - term.mean) / term.scale;
        }

        if sum.is_finite() {
            Ok(sum)
        } else {
            Err(PredictorUnavailable::new("prediction is not finite"))
        }
    }
}

/// Predictor whose artifact is loaded on first use and cached.
///
/// Concurrent first calls load the artifact at most once; every caller
/// then observes the same model, or the same "unavailable" outcome if
/// the load failed.
pub struct LazyPredictor {
    path: PathBuf,
    target: Target,
    handle: OnceLock<Result<LinearModel, PredictorUnavailable>>,
}

impl LazyPredictor {
    pub fn new(path: impl Into<PathBuf>, target: Target) -> Self {
        Self {
            path: path.into(),
            target,
            handle: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn model(&self) -> Result<&LinearModel, PredictorUnavailable> {
        self.handle
            .get_or_init(|| self.load())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn load(&self) -> Result<LinearModel, PredictorUnavailable> {
        let loaded = LinearModel::from_toml_file(&self.path).and_then(|model| {
            if model.target == self.target {
                Ok(model)
            } else {
                Err(PredictorUnavailable::new(format!(
                    "artifact predicts \"{}\", expected \"{}\"",
                    model.target, self.target
                )))
            }
        });

        match &loaded {
            Ok(model) => {
                info!(
                    target_output = %self.target,
                    path = %self.path.display(),
                    terms = model.terms.len(),
                    "loaded model artifact"
                );
                let unmapped = model.unmapped_terms();
                if !unmapped.is_empty() {
                    warn!(
                        target_output = %self.target,
                        ?unmapped,
                        "model terms outside the feature schema will always be imputed"
                    );
                }
            }
            Err(e) => warn!(
                target_output = %self.target,
                path = %self.path.display(),
                reason = %e.reason,
                "model artifact unavailable"
            ),
        }
        loaded
    }
}

impl fmt::Debug for LazyPredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPredictor")
            .field("path", &self.path)
            .field("target", &self.target)
            .field("loaded", &self.handle.get().map(Result::is_ok))
            .finish()
    }
}

impl Predictor for LazyPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictorUnavailable> {
        self.model()?.predict(features)
    }
}

/// Predictors injected into the forecast engine, at most one per target.
#[derive(Clone, Default)]
pub struct PredictorSet {
    predictors: BTreeMap<Target, Arc<dyn Predictor>>,
}

impl PredictorSet {
    /// A set with no predictors: every output uses its formula.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Target, predictor: Arc<dyn Predictor>) -> Self {
        self.predictors.insert(target, predictor);
        self
    }

    pub fn get(&self, target: Target) -> Option<&dyn Predictor> {
        self.predictors.get(&target).map(Arc::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }
}

impl fmt::Debug for PredictorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.predictors.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    const LCOE_ARTIFACT: &str = r#"
schema_version = 1
target = "lcoe"
intercept = 10.0

[[terms]]
name = "capex"
coefficient = 2.0
median = 100.0
mean = 100.0
scale = 50.0

[[terms]]
name = "Electricity tarrif (₦)/KWh              G"
coefficient = 1.0
median = 7.0

[[terms]]
name = "rate of something unrelated"
coefficient = 3.0
median = 1.0
"#;

    #[test]
    fn resolves_exact_names_and_aliases() {
        assert_eq!(resolve_feature("capex"), Some(FeatureInput::Capex));
        assert_eq!(resolve_feature(" PEAK_LOAD "), Some(FeatureInput::PeakDemandKw));
        assert_eq!(
            resolve_feature("initial cost of investment/ - C"),
            Some(FeatureInput::Capex)
        );
    }

    #[test]
    fn substring_does_not_match() {
        assert_eq!(resolve_feature("discount rate of return"), None);
        assert_eq!(resolve_feature("capex_total"), None);
    }

    #[test]
    fn new_vector_is_all_missing() {
        let fv = FeatureVector::new();
        for slot in SCHEMA_V1 {
            assert_eq!(fv.get(slot.input), FeatureValue::Missing);
        }
    }

    #[test]
    fn non_finite_feature_is_missing() {
        let fv = FeatureVector::new().with(FeatureInput::Tariff, f64::NAN);
        assert_eq!(fv.get(FeatureInput::Tariff), FeatureValue::Missing);
    }

    #[test]
    fn linear_model_predicts_with_imputation() {
        let model = LinearModel::from_toml_str(LCOE_ARTIFACT).expect("artifact parses");
        assert_eq!(model.unmapped_terms(), vec!["rate of something unrelated"]);

        // capex 200 -> 2 * (200 - 100) / 50 = 4; tariff missing -> 7; unmapped -> 3
        let fv = FeatureVector::new().with(FeatureInput::Capex, 200.0);
        assert_eq!(model.predict(&fv), Ok(24.0));

        let fv = fv.with(FeatureInput::Tariff, 1.0);
        assert_eq!(model.predict(&fv), Ok(18.0));
    }

    #[test]
    fn wrong_schema_version_is_rejected() {
        let artifact = LCOE_ARTIFACT.replace("schema_version = 1", "schema_version = 2");
        let err = LinearModel::from_toml_str(&artifact);
        assert!(err.is_err());
    }

    #[test]
    fn zero_scale_is_rejected() {
        let artifact = r#"
schema_version = 1
target = "co2"
intercept = 0.0

[[terms]]
name = "annual_load_kwh"
coefficient = 1.0
median = 0.0
scale = 0.0
"#;
        assert!(LinearModel::from_toml_str(artifact).is_err());
    }

    #[test]
    fn overflowing_prediction_is_unavailable() {
        let artifact = r#"
schema_version = 1
target = "co2"
intercept = 1.0e308

[[terms]]
name = "annual_load_kwh"
coefficient = 1.0e308
median = 0.0
"#;
        let model = LinearModel::from_toml_str(artifact).expect("artifact parses");
        let fv = FeatureVector::new().with(FeatureInput::AnnualLoadKwh, 10.0);
        assert!(model.predict(&fv).is_err());
    }

    #[test]
    fn unavailable_stub_always_fails() {
        assert!(Unavailable.predict(&FeatureVector::new()).is_err());
    }

    #[test]
    fn lazy_predictor_missing_file_is_unavailable() {
        let p = LazyPredictor::new("definitely/not/here.toml", Target::Lcoe);
        let first = p.predict(&FeatureVector::new());
        let second = p.predict(&FeatureVector::new());
        assert!(first.is_err());
        assert_eq!(first, second);
    }

    #[test]
    fn lazy_predictor_rejects_target_mismatch() {
        let dir = std::env::temp_dir().join(format!("pv-forecast-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("lcoe_for_capacity.toml");
        fs::write(&path, LCOE_ARTIFACT).expect("write artifact");

        let p = LazyPredictor::new(&path, Target::Capacity);
        let err = p.predict(&FeatureVector::new()).expect_err("target mismatch");
        assert!(err.reason.contains("expected \"capacity\""));

        let ok = LazyPredictor::new(&path, Target::Lcoe);
        assert!(ok.predict(&FeatureVector::new()).is_ok());
        let _ = fs::remove_file(&path);
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Predictor for Counting {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, PredictorUnavailable> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) as f64)
        }
    }

    #[test]
    fn predictor_set_dispatches_by_target() {
        let counting = Arc::new(Counting::default());
        let set = PredictorSet::none().with(Target::Co2, counting.clone());
        assert!(set.get(Target::Lcoe).is_none());
        let p = set.get(Target::Co2).expect("co2 predictor registered");
        assert_eq!(p.predict(&FeatureVector::new()), Ok(0.0));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_predictor_shared_across_threads() {
        let p = Arc::new(LazyPredictor::new("missing/model.toml", Target::Co2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || p.predict(&FeatureVector::new()).is_err())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().ok(), Some(true));
        }
    }
}
