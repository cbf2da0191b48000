//! Stateless techno-economic calculators.
//!
//! Every function here is pure: no I/O, no shared state, bit-identical
//! output for identical input.

/// Carbon-emission reduction.
pub mod carbon;
/// Levelized cost of energy.
pub mod lcoe;
pub mod losses;
/// Actual-vs-expected yield ratio.
pub mod performance;
/// Discounted multi-year cash-flow model.
pub mod savings;
/// PV array and battery sizing heuristics.
pub mod sizing;

pub use carbon::{CarbonParams, CarbonReduction, carbon_reduction};
pub use lcoe::levelized_cost;
pub use performance::performance_ratio;
pub use savings::{
    CashFlowProjection, MAX_LIFETIME_YEARS, Payback, TechnoEconomicInputs, YearlyCashFlow,
    project_savings,
};
pub use sizing::{SizingParams, SizingResult, size_system};
