use std::fmt;
use std::str::FromStr;

use qsb_core::{ErrorInfo, QsbError};
use serde::{Deserialize, Serialize};

/// Single-qubit Pauli symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Identity.
    I,
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
}

impl Pauli {
    /// Parses a symbol, accepting lower case.
    pub fn from_char(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'I' => Some(Pauli::I),
            'X' => Some(Pauli::X),
            'Y' => Some(Pauli::Y),
            'Z' => Some(Pauli::Z),
            _ => None,
        }
    }

    /// Upper-case symbol.
    pub fn as_char(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }

    /// True only for the identity.
    pub fn is_identity(self) -> bool {
        matches!(self, Pauli::I)
    }

    /// Measurement basis index used by randomized measurements (0 = Z, 1 = X, 2 = Y).
    ///
    /// The identity is measured in Z since it imposes no constraint.
    pub fn basis_index(self) -> u8 {
        match self {
            Pauli::I | Pauli::Z => 0,
            Pauli::X => 1,
            Pauli::Y => 2,
        }
    }

    /// Inverse of [`Pauli::basis_index`].
    pub fn from_basis_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Pauli::Z),
            1 => Some(Pauli::X),
            2 => Some(Pauli::Y),
            _ => None,
        }
    }
}

/// Length-n string over {I, X, Y, Z}; character `i` acts on qubit `i`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PauliString {
    symbols: Box<[Pauli]>,
}

impl PauliString {
    /// Builds a Pauli string from explicit symbols.
    pub fn new(symbols: Vec<Pauli>) -> Self {
        Self {
            symbols: symbols.into_boxed_slice(),
        }
    }

    /// All-identity string on `num_qubits` qubits.
    pub fn identity(num_qubits: usize) -> Self {
        Self::new(vec![Pauli::I; num_qubits])
    }

    /// Number of qubits the string acts on.
    pub fn num_qubits(&self) -> usize {
        self.symbols.len()
    }

    /// Symbols in qubit order.
    pub fn symbols(&self) -> &[Pauli] {
        &self.symbols
    }

    /// Symbol acting on `qubit`.
    pub fn get(&self, qubit: usize) -> Option<Pauli> {
        self.symbols.get(qubit).copied()
    }

    /// Count of non-identity symbols.
    pub fn weight(&self) -> usize {
        self.symbols.iter().filter(|p| !p.is_identity()).count()
    }

    /// Ascending qubit indices carrying a non-identity symbol.
    pub fn support(&self) -> Vec<usize> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_identity())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Qubit-wise commutation: on every qubit at least one side is the
    /// identity or both symbols agree.
    pub fn qubit_wise_commutes(&self, other: &PauliString) -> bool {
        self.num_qubits() == other.num_qubits()
            && self
                .symbols
                .iter()
                .zip(other.symbols.iter())
                .all(|(a, b)| a.is_identity() || b.is_identity() || a == b)
    }

    /// Operator commutation: an even number of qubits carry two different
    /// non-identity symbols.
    pub fn commutes(&self, other: &PauliString) -> bool {
        if self.num_qubits() != other.num_qubits() {
            return false;
        }
        let conflicts = self
            .symbols
            .iter()
            .zip(other.symbols.iter())
            .filter(|(a, b)| !a.is_identity() && !b.is_identity() && a != b)
            .count();
        conflicts % 2 == 0
    }

    /// Per-qubit basis indices with identity positions mapped to Z.
    pub fn basis_indices(&self) -> Vec<u8> {
        self.symbols.iter().map(|p| p.basis_index()).collect()
    }

    /// Copy of the string with identity positions replaced by Z.
    pub fn with_identity_as_z(&self) -> PauliString {
        PauliString::new(
            self.symbols
                .iter()
                .map(|p| if p.is_identity() { Pauli::Z } else { *p })
                .collect(),
        )
    }

    /// Parses a label such as `"XIZY"`.
    pub fn parse(label: &str) -> Result<Self, QsbError> {
        let mut symbols = Vec::with_capacity(label.len());
        for (position, symbol) in label.chars().enumerate() {
            let pauli = Pauli::from_char(symbol).ok_or_else(|| {
                QsbError::Config(
                    ErrorInfo::new("invalid-pauli-symbol", "pauli labels use only I, X, Y, Z")
                        .with_context("label", label)
                        .with_context("position", position.to_string())
                        .with_context("symbol", symbol.to_string()),
                )
            })?;
            symbols.push(pauli);
        }
        if symbols.is_empty() {
            return Err(QsbError::config(
                "empty-pauli-label",
                "pauli labels must act on at least one qubit",
            ));
        }
        Ok(Self::new(symbols))
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.symbols.iter() {
            write!(f, "{}", symbol.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for PauliString {
    type Err = QsbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PauliString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PauliString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        PauliString::parse(&label).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_and_support() {
        let p: PauliString = "XIzY".parse().unwrap();
        assert_eq!(p.to_string(), "XIZY");
        assert_eq!(p.weight(), 3);
        assert_eq!(p.support(), vec![0, 2, 3]);
        assert_eq!(p.basis_indices(), vec![1, 0, 0, 2]);
    }

    #[test]
    fn qwc_is_stronger_than_commutation() {
        let xx: PauliString = "XX".parse().unwrap();
        let yy: PauliString = "YY".parse().unwrap();
        assert!(xx.commutes(&yy));
        assert!(!xx.qubit_wise_commutes(&yy));

        let xi: PauliString = "XI".parse().unwrap();
        let xz: PauliString = "XZ".parse().unwrap();
        assert!(xi.qubit_wise_commutes(&xz));
        assert!(xi.commutes(&xz));
    }

    #[test]
    fn rejects_unknown_symbols() {
        let err = PauliString::parse("XQ").unwrap_err();
        assert_eq!(err.code(), "invalid-pauli-symbol");
        assert_eq!(err.info().context.get("position").map(String::as_str), Some("1"));
    }
}
