#![deny(missing_docs)]
#![doc = "Benchmark tasks over per-budget estimate rows: N* search, shot-savings factors, dominance and bias-variance fits."]

pub mod bias_variance;
/// Per-observable quality metrics.
pub mod criterion;
/// Median-metric dominance between two protocols.
pub mod dominance;
/// Task evaluation across every protocol against a baseline.
pub mod evaluate;
/// Minimal-budget search and shot-savings factors.
pub mod nstar;
/// Estimate rows and their budget index.
pub mod rows;

pub use bias_variance::{
    bias_variance, BudgetBiasVariance, ObservableBiasVariance, PowerLawFit, FALLBACK_EXPONENT,
};
pub use criterion::Criterion;
pub use dominance::{dominance, DominanceResult};
pub use evaluate::{evaluate_protocols, ProtocolTaskResult, TaskEvaluation};
pub use nstar::{shot_savings_factor, Aggregation, NStarResult, NStarTask};
pub use rows::{index_rows, protocol_ids, BudgetIndex, BudgetRow};
