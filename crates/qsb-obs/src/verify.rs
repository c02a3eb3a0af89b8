use qsb_core::{ErrorInfo, QsbError};
use serde::{Deserialize, Serialize};

use crate::group::CommutingGroup;
use crate::observable::ObservableSet;
use crate::pauli::Pauli;

/// Single defect found while checking a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionViolation {
    /// An observable index never appears in any group.
    Missing {
        /// Index of the uncovered observable.
        observable: usize,
    },
    /// An observable index appears more than once.
    Duplicated {
        /// Index of the repeated observable.
        observable: usize,
    },
    /// A group references an index outside the set.
    OutOfRange {
        /// Offending group.
        group: usize,
        /// Offending index.
        observable: usize,
    },
    /// Two members of a group do not qubit-wise commute.
    NotQubitWiseCommuting {
        /// Offending group.
        group: usize,
        /// First member.
        left: usize,
        /// Second member.
        right: usize,
    },
    /// A member is not diagonal in the group's measurement basis.
    BasisMismatch {
        /// Offending group.
        group: usize,
        /// Member whose symbol differs from the basis.
        observable: usize,
        /// Qubit where the mismatch occurs.
        qubit: usize,
    },
}

/// Outcome of [`verify_partition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PartitionReport {
    /// All violations found, in discovery order.
    pub violations: Vec<PartitionViolation>,
}

impl PartitionReport {
    /// True when no violation was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks that `groups` is a disjoint cover of `set` whose cells share a basis.
pub fn verify_partition(set: &ObservableSet, groups: &[CommutingGroup]) -> PartitionReport {
    let mut violations = Vec::new();
    let mut seen = vec![0usize; set.len()];

    for group in groups {
        let members = group.members();
        for &member in members {
            match seen.get_mut(member) {
                Some(count) => *count += 1,
                None => violations.push(PartitionViolation::OutOfRange {
                    group: group.group_id(),
                    observable: member,
                }),
            }
        }

        let basis = group.measurement_basis();
        for (position, &left) in members.iter().enumerate() {
            let Some(left_obs) = set.get(left) else {
                continue;
            };
            for &right in &members[position + 1..] {
                if let Some(right_obs) = set.get(right) {
                    if !left_obs.qubit_wise_commutes(right_obs) {
                        violations.push(PartitionViolation::NotQubitWiseCommuting {
                            group: group.group_id(),
                            left,
                            right,
                        });
                    }
                }
            }
            for (qubit, symbol) in left_obs.pauli.symbols().iter().enumerate() {
                let expected = basis.get(qubit).unwrap_or(Pauli::Z);
                if !symbol.is_identity() && *symbol != expected {
                    violations.push(PartitionViolation::BasisMismatch {
                        group: group.group_id(),
                        observable: left,
                        qubit,
                    });
                }
            }
        }
    }

    for (observable, count) in seen.into_iter().enumerate() {
        match count {
            0 => violations.push(PartitionViolation::Missing { observable }),
            1 => {}
            _ => violations.push(PartitionViolation::Duplicated { observable }),
        }
    }

    PartitionReport { violations }
}

/// Turns a failed verification into a configuration error.
pub fn ensure_valid_partition(set: &ObservableSet, groups: &[CommutingGroup]) -> Result<(), QsbError> {
    let report = verify_partition(set, groups);
    if report.is_valid() {
        return Ok(());
    }
    Err(QsbError::Config(
        ErrorInfo::new("invalid-partition", "partition failed verification")
            .with_context("violations", report.violations.len().to_string())
            .with_context("first", format!("{:?}", report.violations[0])),
    ))
}
