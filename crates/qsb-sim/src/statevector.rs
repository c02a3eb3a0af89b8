use num_complex::Complex64;
use qsb_core::{ErrorInfo, QsbError};
use qsb_obs::{Pauli, PauliString};
use qsb_proto::{CircuitSpec, QubitRotation, StatePrep};

/// Largest register the reference simulator accepts.
pub const MAX_QUBITS: usize = 20;

const FRAC_1_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Dense state vector; qubit `i` is bit `i` of the basis index.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl Statevector {
    /// Prepares the state named by `circuit`.
    pub fn prepare(circuit: &CircuitSpec) -> Result<Self, QsbError> {
        circuit.validate()?;
        let num_qubits = circuit.num_qubits;
        if num_qubits > MAX_QUBITS {
            return Err(QsbError::Config(
                ErrorInfo::new("register-too-large", "reference simulator register limit exceeded")
                    .with_context("num_qubits", num_qubits.to_string())
                    .with_context("max", MAX_QUBITS.to_string()),
            ));
        }
        let dim = 1usize << num_qubits;
        let zero = Complex64::new(0.0, 0.0);
        let amplitudes = match &circuit.prep {
            StatePrep::Zero => {
                let mut amps = vec![zero; dim];
                amps[0] = Complex64::new(1.0, 0.0);
                amps
            }
            StatePrep::Ghz => {
                let mut amps = vec![zero; dim];
                amps[0] = Complex64::new(FRAC_1_SQRT_2, 0.0);
                amps[dim - 1] = Complex64::new(FRAC_1_SQRT_2, 0.0);
                amps
            }
            StatePrep::Product { angles } => {
                let qubit_states: Vec<[Complex64; 2]> = angles
                    .iter()
                    .map(|(theta, phi)| {
                        [
                            Complex64::new((theta / 2.0).cos(), 0.0),
                            Complex64::from_polar((theta / 2.0).sin(), *phi),
                        ]
                    })
                    .collect();
                (0..dim)
                    .map(|index| {
                        qubit_states
                            .iter()
                            .enumerate()
                            .fold(Complex64::new(1.0, 0.0), |acc, (qubit, state)| {
                                acc * state[(index >> qubit) & 1]
                            })
                    })
                    .collect()
            }
            StatePrep::Amplitudes { real, imag } => {
                let amps: Vec<Complex64> = real
                    .iter()
                    .zip(imag)
                    .map(|(re, im)| Complex64::new(*re, *im))
                    .collect();
                let norm = amps.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
                if !norm.is_finite() || norm <= 0.0 {
                    return Err(QsbError::Config(
                        ErrorInfo::new("zero-norm-state", "amplitudes must have a positive finite norm")
                            .with_context("circuit", circuit.label.clone()),
                    ));
                }
                amps.into_iter().map(|amp| amp / norm).collect()
            }
        };
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// Register size.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Raw amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Applies a 2×2 unitary `[[a, b], [c, d]]` to `qubit`.
    pub fn apply_single_qubit(&mut self, qubit: usize, gate: [[Complex64; 2]; 2]) {
        let stride = 1usize << qubit;
        for base in 0..self.amplitudes.len() {
            if base & stride != 0 {
                continue;
            }
            let a0 = self.amplitudes[base];
            let a1 = self.amplitudes[base | stride];
            self.amplitudes[base] = gate[0][0] * a0 + gate[0][1] * a1;
            self.amplitudes[base | stride] = gate[1][0] * a0 + gate[1][1] * a1;
        }
    }

    /// Applies a pre-measurement rotation to `qubit`.
    pub fn apply_rotation(&mut self, qubit: usize, rotation: QubitRotation) {
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        match rotation {
            QubitRotation::Identity => {}
            QubitRotation::Hadamard => self.apply_single_qubit(qubit, [[h, h], [h, -h]]),
            // H · S† = 1/√2 [[1, -i], [1, i]]
            QubitRotation::SdgHadamard => {
                let i = Complex64::new(0.0, FRAC_1_SQRT_2);
                self.apply_single_qubit(qubit, [[h, -i], [h, i]]);
            }
        }
    }

    /// Outcome probabilities in basis-index order.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// `⟨ψ|P|ψ⟩` via bit masks: `P|i⟩ = i^{n_Y} (-1)^{|i ∧ (Z|Y)|} |i ⊕ (X|Y)⟩`.
    pub fn expectation(&self, pauli: &PauliString) -> f64 {
        let mut flip_mask = 0usize;
        let mut sign_mask = 0usize;
        let mut y_count = 0u32;
        for (qubit, symbol) in pauli.symbols().iter().enumerate() {
            let bit = 1usize << qubit;
            match symbol {
                Pauli::I => {}
                Pauli::X => flip_mask |= bit,
                Pauli::Y => {
                    flip_mask |= bit;
                    sign_mask |= bit;
                    y_count += 1;
                }
                Pauli::Z => sign_mask |= bit,
            }
        }
        let global = Complex64::new(0.0, 1.0).powu(y_count);
        let total: Complex64 = self
            .amplitudes
            .iter()
            .enumerate()
            .map(|(index, amp)| {
                let sign = if (index & sign_mask).count_ones() % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                self.amplitudes[index ^ flip_mask].conj() * amp * sign
            })
            .sum();
        (global * total).re
    }
}
