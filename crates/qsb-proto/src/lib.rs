#![deny(missing_docs)]
#![doc = "Measurement protocols, the sampler boundary and the direct and shadow estimators."]

/// Direct-family protocols.
pub mod direct;
/// Per-observable estimates and reductions.
pub mod estimate;
pub mod parity;
/// Measurement settings, plans and shot splits.
pub mod plan;
/// Protocol contract and shared options.
pub mod protocol;
/// Classical-shadows protocol.
pub mod randomized;
/// Protocol lookup by id.
pub mod registry;
/// Driving loop.
pub mod runner;
/// Sampler and ground-truth boundary.
pub mod sampler;
pub mod shadow;
/// Protocol state and raw chunks.
pub mod state;

pub use direct::{DirectGrouped, DirectNaive, DirectOptimized, DIRECT_GROUPED, DIRECT_NAIVE, DIRECT_OPTIMIZED};
pub use estimate::{ObservableEstimate, Reduction};
pub use parity::{estimate_direct, parity_eigenvalue};
pub use plan::{uniform_split, weighted_split, MeasurementPlan, MeasurementSetting, SettingBasis};
pub use protocol::{AllocationPolicy, Protocol, ProtocolOptions};
pub use randomized::{draw_basis_choices, ClassicalShadows, CLASSICAL_SHADOWS, SHADOW_SETTING};
pub use registry::ProtocolRegistry;
pub use runner::{run_protocol, ProtocolRun, RoundDiagnostics};
pub use sampler::{
    format_bitstring, parse_bitstring, truth_table, BasisRotatedCircuit, CircuitSpec, GroundTruth,
    QubitRotation, SampleResult, Sampler, StatePrep,
};
pub use shadow::{
    estimate_shadow, median_of_means, required_basis, shadow_contribution, shadow_contributions,
    shadow_variance_bound,
};
pub use state::{ProtocolState, RawDatasetChunk};
