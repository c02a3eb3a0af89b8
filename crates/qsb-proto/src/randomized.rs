use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_core::{derive_labelled_seed, derive_substream_seed, ErrorInfo, QsbError, RngHandle};
use qsb_obs::{ObservableSet, Pauli, PauliString};
use rand::Rng;
use tracing::debug;

use crate::estimate::ObservableEstimate;
use crate::plan::{MeasurementPlan, MeasurementSetting, SettingBasis};
use crate::protocol::{ensure_same_set, Protocol, ProtocolOptions};
use crate::sampler::{parse_bitstring, BasisRotatedCircuit, CircuitSpec, Sampler};
use crate::shadow::{estimate_shadow, median_of_means, shadow_contributions};
use crate::state::{ProtocolState, RawDatasetChunk};

/// Registry id of [`ClassicalShadows`].
pub const CLASSICAL_SHADOWS: &str = "classical_shadows";

/// Setting id of the single random setting.
pub const SHADOW_SETTING: &str = "shadow";

/// Uniform per-qubit basis indices (`0 = Z`, `1 = X`, `2 = Y`) for `n_shots` shots.
pub fn draw_basis_choices<R: Rng + ?Sized>(n_shots: usize, num_qubits: usize, rng: &mut R) -> Vec<Vec<u8>> {
    (0..n_shots)
        .map(|_| (0..num_qubits).map(|_| rng.gen_range(0..3u8)).collect())
        .collect()
}

fn basis_from_indices(indices: &[u8]) -> PauliString {
    PauliString::new(
        indices
            .iter()
            .map(|index| Pauli::from_basis_index(*index).unwrap_or(Pauli::Z))
            .collect(),
    )
}

/// Random local Pauli measurements over the whole register.
#[derive(Debug, Clone, Default)]
pub struct ClassicalShadows {
    options: ProtocolOptions,
}

impl ClassicalShadows {
    /// Creates the protocol.
    pub fn new(options: ProtocolOptions) -> Self {
        Self { options }
    }
}

impl Protocol for ClassicalShadows {
    fn id(&self) -> &str {
        CLASSICAL_SHADOWS
    }

    fn initialize(&self, set: Arc<ObservableSet>, budget: usize, seed: u64) -> Result<ProtocolState, QsbError> {
        let layout = vec![MeasurementSetting {
            setting_id: SHADOW_SETTING.to_string(),
            basis: SettingBasis::Random,
            targets: (0..set.num_qubits()).collect(),
            observables: (0..set.len()).collect(),
        }];
        Ok(ProtocolState::new(set, budget, seed, layout))
    }

    fn plan(&self, state: &ProtocolState) -> Result<MeasurementPlan, QsbError> {
        MeasurementPlan::new(state.layout().to_vec(), vec![state.remaining_budget()])
    }

    /// Draws bases per shot, delegates shots sharing a basis pattern in one
    /// sampler call and scatters the outcomes back into shot order.
    fn acquire(
        &self,
        circuit: &CircuitSpec,
        plan: &MeasurementPlan,
        sampler: &dyn Sampler,
        seed: u64,
    ) -> Result<RawDatasetChunk, QsbError> {
        let n_shots = plan.total_shots();
        let num_qubits = circuit.num_qubits;
        let mut rng = RngHandle::from_seed(derive_labelled_seed(seed, "bases"));
        let basis_choices = draw_basis_choices(n_shots, num_qubits, &mut rng);

        let mut patterns: BTreeMap<&[u8], Vec<usize>> = BTreeMap::new();
        for (shot, pattern) in basis_choices.iter().enumerate() {
            patterns.entry(pattern.as_slice()).or_default().push(shot);
        }

        let mut outcomes = vec![Vec::new(); n_shots];
        for (pattern_index, (pattern, shots)) in patterns.iter().enumerate() {
            let basis = basis_from_indices(pattern);
            let rotated = BasisRotatedCircuit::new(circuit, &basis)?;
            let result = sampler.sample(
                &rotated,
                shots.len(),
                derive_substream_seed(seed, pattern_index as u64),
            )?;
            if result.len() != shots.len() {
                return Err(QsbError::Sampler(
                    ErrorInfo::new("short-sample", "sampler returned the wrong number of shots")
                        .with_context("basis", basis.to_string())
                        .with_context("requested", shots.len().to_string())
                        .with_context("returned", result.len().to_string()),
                ));
            }
            for (&shot, bitstring) in shots.iter().zip(&result.bitstrings) {
                outcomes[shot] = parse_bitstring(bitstring, num_qubits)?;
            }
        }
        debug!(shots = n_shots, patterns = patterns.len(), "acquired shadow round");
        Ok(RawDatasetChunk::Shadow {
            outcomes,
            basis_choices,
        })
    }

    fn update(&self, state: ProtocolState, chunk: RawDatasetChunk) -> Result<ProtocolState, QsbError> {
        Ok(state.absorb(chunk)?.with_converged(true))
    }

    fn finalize(&self, state: &ProtocolState, set: &ObservableSet) -> Result<Vec<ObservableEstimate>, QsbError> {
        ensure_same_set(state, set)?;
        let (outcomes, bases) = state.shadow_rows();
        let mut rng = RngHandle::from_seed(derive_labelled_seed(state.seed(), "ci"));
        set.iter()
            .map(|observable| {
                let reduction = match self.options.median_of_means {
                    Some(groups) if observable.locality() > 0 => median_of_means(
                        shadow_contributions(&outcomes, &bases, observable),
                        groups,
                    ),
                    _ => estimate_shadow(&outcomes, &bases, observable),
                };
                reduction.into_estimate(&observable.id, outcomes.len(), self.options.ci.as_ref(), &mut rng)
            })
            .collect()
    }
}
