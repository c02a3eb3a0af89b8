#![deny(missing_docs)]
#![doc = "Pauli-string observables, qubit-wise commutation and commuting-group partitioning."]

/// Commuting-group construction.
pub mod group;
/// Observable and observable-set types.
pub mod observable;
/// Single-qubit and multi-qubit Pauli labels.
pub mod pauli;
/// Partition verification.
pub mod verify;

pub use group::{partition, CommutingGroup, GroupingMethod, PartitionSummary};
pub use observable::{Observable, ObservableSet};
pub use pauli::{Pauli, PauliString};
pub use verify::{ensure_valid_partition, verify_partition, PartitionReport, PartitionViolation};
