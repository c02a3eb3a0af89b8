use qsb_core::{ErrorInfo, QsbError, RngHandle};
use qsb_obs::Observable;
use qsb_proto::{BasisRotatedCircuit, CircuitSpec, GroundTruth, SampleResult, Sampler};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::statevector::Statevector;

/// Ideal or readout-noisy sampler backed by [`Statevector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StatevectorSampler {
    readout_error: f64,
}

impl StatevectorSampler {
    /// Noise-free sampler.
    pub fn ideal() -> Self {
        Self::default()
    }

    /// Sampler flipping every reported bit independently with probability `p`.
    pub fn with_readout_error(p: f64) -> Result<Self, QsbError> {
        if !(0.0..=0.5).contains(&p) {
            return Err(QsbError::Config(
                ErrorInfo::new("invalid-readout-error", "readout flip probability must lie in [0, 0.5]")
                    .with_context("p", p.to_string()),
            ));
        }
        Ok(Self { readout_error: p })
    }

    /// Bit-flip probability.
    pub fn readout_error(&self) -> f64 {
        self.readout_error
    }
}

impl Sampler for StatevectorSampler {
    fn sample(
        &self,
        circuit: &BasisRotatedCircuit<'_>,
        n_shots: usize,
        seed: u64,
    ) -> Result<SampleResult, QsbError> {
        let mut state = Statevector::prepare(circuit.circuit())?;
        for (qubit, rotation) in circuit.rotations().iter().enumerate() {
            state.apply_rotation(qubit, *rotation);
        }
        let mut cumulative = Vec::with_capacity(1 << state.num_qubits());
        let mut running = 0.0;
        for p in state.probabilities() {
            running += p;
            cumulative.push(running);
        }
        let last = cumulative.len() - 1;

        let mut rng = RngHandle::from_seed(seed);
        let num_qubits = state.num_qubits();
        let bitstrings = (0..n_shots)
            .map(|_| {
                let draw: f64 = rng.gen::<f64>() * running;
                let index = cumulative.partition_point(|c| *c <= draw).min(last);
                (0..num_qubits)
                    .map(|qubit| {
                        let mut bit = (index >> qubit) & 1 == 1;
                        if self.readout_error > 0.0 && rng.gen_bool(self.readout_error) {
                            bit = !bit;
                        }
                        if bit {
                            '1'
                        } else {
                            '0'
                        }
                    })
                    .collect()
            })
            .collect();
        trace!(shots = n_shots, basis = %circuit.basis(), "sampled statevector");
        Ok(SampleResult::new(bitstrings))
    }
}

impl GroundTruth for StatevectorSampler {
    fn compute_expectation(&self, circuit: &CircuitSpec, observable: &Observable) -> Result<f64, QsbError> {
        if observable.num_qubits() != circuit.num_qubits {
            return Err(QsbError::Config(
                ErrorInfo::new("observable-qubit-mismatch", "observable does not fit the circuit")
                    .with_context("observable", observable.id.clone())
                    .with_context("expected", circuit.num_qubits.to_string())
                    .with_context("found", observable.num_qubits().to_string()),
            ));
        }
        let state = Statevector::prepare(circuit)?;
        Ok(observable.coefficient * state.expectation(&observable.pauli))
    }
}
