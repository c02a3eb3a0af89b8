#![deny(missing_docs)]
#![doc = "Reference state-vector sampler and exact expectation values for small registers."]

/// Statevector sampler and ground-truth provider.
pub mod sampler;
/// Dense state preparation, basis rotation and Pauli expectation values.
pub mod statevector;

pub use sampler::StatevectorSampler;
pub use statevector::{Statevector, MAX_QUBITS};
