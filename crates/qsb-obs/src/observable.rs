use std::collections::BTreeSet;

use qsb_core::{stable_hash_string, ErrorInfo, QsbError};
use serde::{Deserialize, Serialize};

use crate::pauli::PauliString;

/// Weighted Pauli observable `coefficient * P`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    /// Stable identifier used to key estimates and truth tables.
    pub id: String,
    /// Pauli label.
    pub pauli: PauliString,
    /// Real coefficient multiplying the Pauli operator.
    pub coefficient: f64,
}

impl Observable {
    /// Creates an observable from an already parsed Pauli string.
    pub fn new(id: impl Into<String>, pauli: PauliString, coefficient: f64) -> Self {
        Self {
            id: id.into(),
            pauli,
            coefficient,
        }
    }

    /// Parses `label` and builds an observable.
    pub fn parse(id: impl Into<String>, label: &str, coefficient: f64) -> Result<Self, QsbError> {
        Ok(Self::new(id, PauliString::parse(label)?, coefficient))
    }

    /// Number of non-identity symbols.
    pub fn locality(&self) -> usize {
        self.pauli.weight()
    }

    /// Qubits carrying a non-identity symbol.
    pub fn support(&self) -> Vec<usize> {
        self.pauli.support()
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.pauli.num_qubits()
    }

    /// Qubit-wise commutation with another observable.
    pub fn qubit_wise_commutes(&self, other: &Observable) -> bool {
        self.pauli.qubit_wise_commutes(&other.pauli)
    }

    /// Operator commutation with another observable.
    pub fn commutes(&self, other: &Observable) -> bool {
        self.pauli.commutes(&other.pauli)
    }
}

/// Ordered, non-empty collection of observables on a common register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observable>", into = "Vec<Observable>")]
pub struct ObservableSet {
    num_qubits: usize,
    observables: Vec<Observable>,
}

impl ObservableSet {
    /// Validates and builds a set.
    pub fn new(observables: Vec<Observable>) -> Result<Self, QsbError> {
        let Some(first) = observables.first() else {
            return Err(QsbError::config(
                "observable-set-empty",
                "an observable set needs at least one observable",
            ));
        };
        let num_qubits = first.num_qubits();
        let mut ids = BTreeSet::new();
        for (index, observable) in observables.iter().enumerate() {
            if observable.num_qubits() != num_qubits {
                return Err(QsbError::Config(
                    ErrorInfo::new(
                        "observable-qubit-mismatch",
                        "all observables in a set must act on the same number of qubits",
                    )
                    .with_context("observable", observable.id.clone())
                    .with_context("index", index.to_string())
                    .with_context("expected", num_qubits.to_string())
                    .with_context("found", observable.num_qubits().to_string()),
                ));
            }
            if !ids.insert(observable.id.as_str()) {
                return Err(QsbError::Config(
                    ErrorInfo::new("observable-duplicate-id", "observable ids must be unique")
                        .with_context("observable", observable.id.clone()),
                ));
            }
        }
        Ok(Self {
            num_qubits,
            observables,
        })
    }

    /// Convenience constructor from `(id, label, coefficient)` triples.
    pub fn from_labels<'a, I>(entries: I) -> Result<Self, QsbError>
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let observables = entries
            .into_iter()
            .map(|(id, label, coefficient)| Observable::parse(id, label, coefficient))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(observables)
    }

    /// Shared register size.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of observables.
    pub fn len(&self) -> usize {
        self.observables.len()
    }

    /// Always false for a constructed set; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.observables.is_empty()
    }

    /// Observables in input order.
    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    /// Observable at `index`.
    pub fn get(&self, index: usize) -> Option<&Observable> {
        self.observables.get(index)
    }

    /// Iterator over the observables.
    pub fn iter(&self) -> std::slice::Iter<'_, Observable> {
        self.observables.iter()
    }

    /// Index of the observable with the given id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.observables.iter().position(|obs| obs.id == id)
    }

    /// Largest locality in the set.
    pub fn max_locality(&self) -> usize {
        self.observables
            .iter()
            .map(Observable::locality)
            .max()
            .unwrap_or(0)
    }

    /// Canonical hash of the set used in report provenance.
    pub fn canonical_hash(&self) -> Result<String, QsbError> {
        stable_hash_string(&self.observables)
    }
}

impl TryFrom<Vec<Observable>> for ObservableSet {
    type Error = QsbError;

    fn try_from(value: Vec<Observable>) -> Result<Self, Self::Error> {
        ObservableSet::new(value)
    }
}

impl From<ObservableSet> for Vec<Observable> {
    fn from(value: ObservableSet) -> Self {
        value.observables
    }
}

impl<'a> IntoIterator for &'a ObservableSet {
    type Item = &'a Observable;
    type IntoIter = std::slice::Iter<'a, Observable>;

    fn into_iter(self) -> Self::IntoIter {
        self.observables.iter()
    }
}
