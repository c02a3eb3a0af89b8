use std::fmt;
use std::str::FromStr;

use qsb_core::{ErrorInfo, QsbError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::observable::ObservableSet;
use crate::pauli::{Pauli, PauliString};

/// Partitioning policy used to build commuting groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMethod {
    /// Seed a group with the first ungrouped observable and absorb every later
    /// observable that qubit-wise commutes with all current members.
    #[default]
    Greedy,
    /// Place high-locality observables first, each into the first compatible group.
    SortedInsertion,
}

impl GroupingMethod {
    /// Stable label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMethod::Greedy => "greedy",
            GroupingMethod::SortedInsertion => "sorted_insertion",
        }
    }
}

impl fmt::Display for GroupingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupingMethod {
    type Err = QsbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(GroupingMethod::Greedy),
            "sorted_insertion" | "sorted-insertion" => Ok(GroupingMethod::SortedInsertion),
            other => Err(QsbError::Config(
                ErrorInfo::new("unknown-grouping-method", "unsupported grouping method")
                    .with_context("method", other)
                    .with_hint("use greedy or sorted_insertion"),
            )),
        }
    }
}

/// One cell of a partition: observables measurable in a single basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommutingGroup {
    group_id: usize,
    members: Vec<usize>,
    shared_basis: PauliString,
}

impl CommutingGroup {
    /// Builds a group, failing if two members disagree on a qubit.
    pub fn new(
        group_id: usize,
        members: Vec<usize>,
        set: &ObservableSet,
    ) -> Result<Self, QsbError> {
        let mut basis = vec![Pauli::I; set.num_qubits()];
        for &member in &members {
            let observable = set.get(member).ok_or_else(|| {
                QsbError::Config(
                    ErrorInfo::new("group-member-out-of-range", "group references a missing observable")
                        .with_context("group", group_id.to_string())
                        .with_context("member", member.to_string()),
                )
            })?;
            merge_into_basis(&mut basis, &observable.pauli).map_err(|qubit| {
                QsbError::Config(
                    ErrorInfo::new("no-shared-basis", "group members disagree on a qubit")
                        .with_context("group", group_id.to_string())
                        .with_context("observable", observable.id.clone())
                        .with_context("qubit", qubit.to_string()),
                )
            })?;
        }
        Ok(Self {
            group_id,
            members,
            shared_basis: PauliString::new(basis),
        })
    }

    /// Group identifier (creation order).
    pub fn group_id(&self) -> usize {
        self.group_id
    }

    /// Observable indices belonging to the group.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Union of member symbols, `I` where no member acts.
    pub fn shared_basis(&self) -> &PauliString {
        &self.shared_basis
    }

    /// Basis actually measured: identity positions default to Z.
    pub fn measurement_basis(&self) -> PauliString {
        self.shared_basis.with_identity_as_z()
    }
}

/// Merges `pauli` into a partially built basis, reporting the first
/// conflicting qubit.
fn merge_into_basis(basis: &mut [Pauli], pauli: &PauliString) -> Result<(), usize> {
    for (qubit, symbol) in pauli.symbols().iter().enumerate() {
        if symbol.is_identity() {
            continue;
        }
        match basis[qubit] {
            Pauli::I => basis[qubit] = *symbol,
            existing if existing == *symbol => {}
            _ => return Err(qubit),
        }
    }
    Ok(())
}

/// Merges `pauli` into `basis` when every non-identity symbol agrees with it;
/// on a conflict `basis` is left untouched and `false` is returned.
fn try_merge(basis: &mut [Pauli], pauli: &PauliString) -> bool {
    let compatible = pauli
        .symbols()
        .iter()
        .zip(basis.iter())
        .all(|(candidate, existing)| {
            candidate.is_identity() || existing.is_identity() || candidate == existing
        });
    if compatible {
        for (slot, symbol) in basis.iter_mut().zip(pauli.symbols()) {
            if !symbol.is_identity() {
                *slot = *symbol;
            }
        }
    }
    compatible
}

/// Partitions `set` into commuting groups with the requested policy.
pub fn partition(set: &ObservableSet, method: GroupingMethod) -> Result<Vec<CommutingGroup>, QsbError> {
    let cells = match method {
        GroupingMethod::Greedy => greedy_cells(set),
        GroupingMethod::SortedInsertion => sorted_insertion_cells(set),
    };
    let groups = cells
        .into_iter()
        .enumerate()
        .map(|(group_id, members)| CommutingGroup::new(group_id, members, set))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        method = method.as_str(),
        observables = set.len(),
        groups = groups.len(),
        "partitioned observable set"
    );
    Ok(groups)
}

fn greedy_cells(set: &ObservableSet) -> Vec<Vec<usize>> {
    let observables = set.observables();
    let mut grouped = vec![false; observables.len()];
    let mut cells = Vec::new();
    for seed in 0..observables.len() {
        if grouped[seed] {
            continue;
        }
        grouped[seed] = true;
        let mut members = vec![seed];
        for candidate in (seed + 1)..observables.len() {
            if grouped[candidate] {
                continue;
            }
            let fits = members
                .iter()
                .all(|&member| observables[member].qubit_wise_commutes(&observables[candidate]));
            if fits {
                grouped[candidate] = true;
                members.push(candidate);
            }
        }
        cells.push(members);
    }
    cells
}

fn sorted_insertion_cells(set: &ObservableSet) -> Vec<Vec<usize>> {
    let observables = set.observables();
    let mut order: Vec<usize> = (0..observables.len()).collect();
    // Stable sort keeps input order among equal localities.
    order.sort_by(|a, b| observables[*b].locality().cmp(&observables[*a].locality()));

    let mut cells: Vec<(Vec<Pauli>, Vec<usize>)> = Vec::new();
    for index in order {
        let pauli = &observables[index].pauli;
        let merged = cells
            .iter_mut()
            .find_map(|(basis, members)| try_merge(basis, pauli).then_some(members));
        match merged {
            Some(members) => members.push(index),
            None => cells.push((pauli.symbols().to_vec(), vec![index])),
        }
    }
    cells.into_iter().map(|(_, members)| members).collect()
}

/// Aggregate shape of a partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// Number of groups.
    pub groups: usize,
    /// Size of the largest group.
    pub largest_group: usize,
    /// Number of groups holding a single observable.
    pub singleton_groups: usize,
    /// Observables per measurement setting (`M / G`).
    pub compression_ratio: f64,
}

impl PartitionSummary {
    /// Summarises a list of groups.
    pub fn from_groups(groups: &[CommutingGroup]) -> Self {
        let total: usize = groups.iter().map(CommutingGroup::len).sum();
        let count = groups.len();
        let ratio = if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        };
        Self {
            groups: count,
            largest_group: groups.iter().map(CommutingGroup::len).max().unwrap_or(0),
            singleton_groups: groups.iter().filter(|group| group.len() == 1).count(),
            compression_ratio: ratio,
        }
    }
}
