#![allow(dead_code)]

use qsb_core::{QsbError, RngHandle};
use qsb_proto::{BasisRotatedCircuit, CircuitSpec, QubitRotation, SampleResult, Sampler, StatePrep};
use rand::Rng;

/// Samples `|0…0⟩`: Z-basis qubits read 0, rotated qubits are fair coins.
pub struct ZeroStateSampler;

impl Sampler for ZeroStateSampler {
    fn sample(
        &self,
        circuit: &BasisRotatedCircuit<'_>,
        n_shots: usize,
        seed: u64,
    ) -> Result<SampleResult, QsbError> {
        let mut rng = RngHandle::from_seed(seed);
        let bitstrings = (0..n_shots)
            .map(|_| {
                circuit
                    .rotations()
                    .iter()
                    .map(|rotation| match rotation {
                        QubitRotation::Identity => '0',
                        _ if rng.gen_bool(0.5) => '1',
                        _ => '0',
                    })
                    .collect()
            })
            .collect();
        Ok(SampleResult::new(bitstrings))
    }
}

/// Reports `1` exactly on qubits measured in the X basis.
pub struct BasisEchoSampler;

impl Sampler for BasisEchoSampler {
    fn sample(
        &self,
        circuit: &BasisRotatedCircuit<'_>,
        n_shots: usize,
        _seed: u64,
    ) -> Result<SampleResult, QsbError> {
        let row: String = circuit
            .rotations()
            .iter()
            .map(|rotation| if *rotation == QubitRotation::Hadamard { '1' } else { '0' })
            .collect();
        Ok(SampleResult::new(vec![row; n_shots]))
    }
}

/// Returns one shot fewer than requested.
pub struct ShortSampler;

impl Sampler for ShortSampler {
    fn sample(
        &self,
        circuit: &BasisRotatedCircuit<'_>,
        n_shots: usize,
        _seed: u64,
    ) -> Result<SampleResult, QsbError> {
        let row = "0".repeat(circuit.num_qubits());
        Ok(SampleResult::new(vec![row; n_shots.saturating_sub(1)]))
    }
}

pub fn zero_circuit(num_qubits: usize) -> CircuitSpec {
    CircuitSpec::new("zero", num_qubits, StatePrep::Zero).expect("circuit")
}
