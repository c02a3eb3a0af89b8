use std::collections::BTreeMap;

use qsb_core::{ErrorInfo, QsbError};
use qsb_obs::{Observable, ObservableSet, Pauli, PauliString};
use serde::{Deserialize, Serialize};

/// State family handed to the sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatePrep {
    /// `|0…0⟩`.
    Zero,
    /// Product state, one `(theta, phi)` Bloch angle pair per qubit.
    Product {
        /// Per-qubit `(theta, phi)`.
        angles: Vec<(f64, f64)>,
    },
    /// `(|0…0⟩ + |1…1⟩) / √2`.
    Ghz,
    /// Explicit amplitudes in little-endian qubit order (qubit `i` is bit `i`
    /// of the basis index).
    Amplitudes {
        /// Real parts.
        real: Vec<f64>,
        /// Imaginary parts.
        imag: Vec<f64>,
    },
}

/// Circuit description passed through to the sampler untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSpec {
    /// Free-form label recorded in reports.
    pub label: String,
    /// Register size.
    pub num_qubits: usize,
    /// State preparation.
    pub prep: StatePrep,
}

impl CircuitSpec {
    /// Builds a circuit spec, checking that the preparation fits the register.
    pub fn new(label: impl Into<String>, num_qubits: usize, prep: StatePrep) -> Result<Self, QsbError> {
        let spec = Self {
            label: label.into(),
            num_qubits,
            prep,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks register size against the preparation payload.
    pub fn validate(&self) -> Result<(), QsbError> {
        let mismatch = |what: &str, expected: usize, found: usize| {
            QsbError::Config(
                ErrorInfo::new("circuit-prep-mismatch", "state preparation does not fit the register")
                    .with_context("circuit", self.label.clone())
                    .with_context("field", what)
                    .with_context("expected", expected.to_string())
                    .with_context("found", found.to_string()),
            )
        };
        if self.num_qubits == 0 {
            return Err(mismatch("num_qubits", 1, 0));
        }
        match &self.prep {
            StatePrep::Zero | StatePrep::Ghz => Ok(()),
            StatePrep::Product { angles } if angles.len() != self.num_qubits => {
                Err(mismatch("angles", self.num_qubits, angles.len()))
            }
            StatePrep::Product { .. } => Ok(()),
            StatePrep::Amplitudes { real, imag } => {
                let dim = u32::try_from(self.num_qubits)
                    .ok()
                    .and_then(|shift| 1usize.checked_shl(shift))
                    .unwrap_or(0);
                if real.len() != dim {
                    return Err(mismatch("real", dim, real.len()));
                }
                if imag.len() != dim {
                    return Err(mismatch("imag", dim, imag.len()));
                }
                Ok(())
            }
        }
    }
}

/// Single-qubit pre-measurement rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QubitRotation {
    /// Measure Z directly.
    Identity,
    /// `H`, maps X eigenstates onto the computational basis.
    Hadamard,
    /// `S†` then `H`, maps Y eigenstates onto the computational basis.
    SdgHadamard,
}

impl QubitRotation {
    /// Rotation needed to read `basis` in the computational basis.
    pub fn for_basis(basis: Pauli) -> Self {
        match basis {
            Pauli::X => QubitRotation::Hadamard,
            Pauli::Y => QubitRotation::SdgHadamard,
            Pauli::I | Pauli::Z => QubitRotation::Identity,
        }
    }
}

/// Circuit with a measurement basis appended as per-qubit rotations.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisRotatedCircuit<'a> {
    circuit: &'a CircuitSpec,
    basis: PauliString,
    rotations: Vec<QubitRotation>,
}

impl<'a> BasisRotatedCircuit<'a> {
    /// Appends the rotations for `basis`; identity positions are read in Z.
    pub fn new(circuit: &'a CircuitSpec, basis: &PauliString) -> Result<Self, QsbError> {
        if basis.num_qubits() != circuit.num_qubits {
            return Err(QsbError::Config(
                ErrorInfo::new("basis-qubit-mismatch", "measurement basis does not fit the circuit")
                    .with_context("circuit", circuit.label.clone())
                    .with_context("expected", circuit.num_qubits.to_string())
                    .with_context("found", basis.num_qubits().to_string()),
            ));
        }
        let basis = basis.with_identity_as_z();
        let rotations = basis
            .symbols()
            .iter()
            .copied()
            .map(QubitRotation::for_basis)
            .collect();
        Ok(Self {
            circuit,
            basis,
            rotations,
        })
    }

    /// Underlying circuit.
    pub fn circuit(&self) -> &CircuitSpec {
        self.circuit
    }

    /// Measurement basis without identity symbols.
    pub fn basis(&self) -> &PauliString {
        &self.basis
    }

    /// Rotation applied to each qubit before measuring.
    pub fn rotations(&self) -> &[QubitRotation] {
        &self.rotations
    }

    /// Register size.
    pub fn num_qubits(&self) -> usize {
        self.circuit.num_qubits
    }
}

/// Shot-ordered outcome bitstrings; character `i` is qubit `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SampleResult {
    /// One bitstring per shot.
    pub bitstrings: Vec<String>,
}

impl SampleResult {
    /// Wraps shot-ordered bitstrings.
    pub fn new(bitstrings: Vec<String>) -> Self {
        Self { bitstrings }
    }

    /// Number of shots.
    pub fn len(&self) -> usize {
        self.bitstrings.len()
    }

    /// True when no shot was returned.
    pub fn is_empty(&self) -> bool {
        self.bitstrings.is_empty()
    }

    /// Histogram of outcomes.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for bitstring in &self.bitstrings {
            *counts.entry(bitstring.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// External device boundary: sample a basis-rotated circuit.
pub trait Sampler: Send + Sync {
    /// Draws `n_shots` outcomes. The same seed must reproduce the same shots.
    fn sample(
        &self,
        circuit: &BasisRotatedCircuit<'_>,
        n_shots: usize,
        seed: u64,
    ) -> Result<SampleResult, QsbError>;
}

/// Exact expectation values used by truth-based criteria and regret.
pub trait GroundTruth: Send + Sync {
    /// Returns `coefficient · ⟨P⟩` for the prepared state.
    fn compute_expectation(
        &self,
        circuit: &CircuitSpec,
        observable: &Observable,
    ) -> Result<f64, QsbError>;
}

/// Truth table keyed by observable id.
pub fn truth_table(
    truth: &dyn GroundTruth,
    circuit: &CircuitSpec,
    set: &ObservableSet,
) -> Result<BTreeMap<String, f64>, QsbError> {
    set.iter()
        .map(|observable| {
            truth
                .compute_expectation(circuit, observable)
                .map(|value| (observable.id.clone(), value))
        })
        .collect()
}

/// Parses a bitstring into per-qubit bits.
pub fn parse_bitstring(bitstring: &str, num_qubits: usize) -> Result<Vec<u8>, QsbError> {
    let malformed = || {
        QsbError::Data(
            ErrorInfo::new("malformed-bitstring", "outcome is not a bitstring of the register size")
                .with_context("bitstring", bitstring)
                .with_context("num_qubits", num_qubits.to_string()),
        )
    };
    if bitstring.len() != num_qubits {
        return Err(malformed());
    }
    bitstring
        .bytes()
        .map(|byte| match byte {
            b'0' => Ok(0),
            b'1' => Ok(1),
            _ => Err(malformed()),
        })
        .collect()
}

/// Renders per-qubit bits as a bitstring.
pub fn format_bitstring(bits: &[u8]) -> String {
    bits.iter().map(|bit| if *bit == 0 { '0' } else { '1' }).collect()
}
