use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_core::{derive_labelled_seed, derive_substream_seed, ErrorInfo, QsbError, RngHandle};
use qsb_obs::{partition, ObservableSet};
use tracing::debug;

use crate::estimate::ObservableEstimate;
use crate::parity::estimate_direct;
use crate::plan::{uniform_split, weighted_split, MeasurementPlan, MeasurementSetting, SettingBasis};
use crate::protocol::{ensure_same_set, Protocol, ProtocolOptions};
use crate::sampler::{BasisRotatedCircuit, CircuitSpec, Sampler};
use crate::state::{ProtocolState, RawDatasetChunk};

/// Registry id of [`DirectNaive`].
pub const DIRECT_NAIVE: &str = "direct_naive";
/// Registry id of [`DirectGrouped`].
pub const DIRECT_GROUPED: &str = "direct_grouped";
/// Registry id of [`DirectOptimized`].
pub const DIRECT_OPTIMIZED: &str = "direct_optimized";

fn per_observable_layout(set: &ObservableSet) -> Vec<MeasurementSetting> {
    set.iter()
        .enumerate()
        .map(|(index, observable)| MeasurementSetting {
            setting_id: format!("obs-{index}"),
            basis: SettingBasis::Fixed(observable.pauli.with_identity_as_z()),
            targets: observable.support(),
            observables: vec![index],
        })
        .collect()
}

fn grouped_layout(set: &ObservableSet, options: &ProtocolOptions) -> Result<Vec<MeasurementSetting>, QsbError> {
    let groups = partition(set, options.grouping)?;
    Ok(groups
        .into_iter()
        .map(|group| MeasurementSetting {
            setting_id: format!("group-{}", group.group_id()),
            basis: SettingBasis::Fixed(group.measurement_basis()),
            targets: group.shared_basis().support(),
            observables: group.members().to_vec(),
        })
        .collect())
}

fn plan_with(state: &ProtocolState, shots: Vec<usize>) -> Result<MeasurementPlan, QsbError> {
    MeasurementPlan::new(state.layout().to_vec(), shots)
}

/// Samples every fixed-basis setting of the plan.
fn acquire_fixed(
    circuit: &CircuitSpec,
    plan: &MeasurementPlan,
    sampler: &dyn Sampler,
    seed: u64,
) -> Result<RawDatasetChunk, QsbError> {
    let mut outcomes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (index, (setting, shots)) in plan.iter().enumerate() {
        let SettingBasis::Fixed(basis) = &setting.basis else {
            return Err(QsbError::Data(
                ErrorInfo::new("unexpected-random-setting", "direct protocols only measure fixed bases")
                    .with_context("setting", setting.setting_id.clone()),
            ));
        };
        let rotated = BasisRotatedCircuit::new(circuit, basis)?;
        let result = sampler.sample(&rotated, shots, derive_substream_seed(seed, index as u64))?;
        if result.len() != shots {
            return Err(QsbError::Sampler(
                ErrorInfo::new("short-sample", "sampler returned the wrong number of shots")
                    .with_context("setting", setting.setting_id.clone())
                    .with_context("requested", shots.to_string())
                    .with_context("returned", result.len().to_string()),
            ));
        }
        outcomes
            .entry(setting.setting_id.clone())
            .or_default()
            .extend(result.bitstrings);
    }
    Ok(RawDatasetChunk::Direct { outcomes })
}

/// Parity estimates for every observable, read from its setting's outcomes.
fn finalize_fixed(
    state: &ProtocolState,
    set: &ObservableSet,
    options: &ProtocolOptions,
) -> Result<Vec<ObservableEstimate>, QsbError> {
    ensure_same_set(state, set)?;
    let mut rng = RngHandle::from_seed(derive_labelled_seed(state.seed(), "ci"));
    let mut estimates: Vec<Option<ObservableEstimate>> = vec![None; set.len()];
    for setting in state.layout() {
        let bitstrings = state.direct_outcomes(&setting.setting_id);
        for &index in &setting.observables {
            let Some(observable) = set.get(index) else {
                continue;
            };
            let reduction = estimate_direct(observable, &bitstrings);
            estimates[index] = Some(reduction.into_estimate(
                &observable.id,
                bitstrings.len(),
                options.ci.as_ref(),
                &mut rng,
            )?);
        }
    }
    estimates
        .into_iter()
        .enumerate()
        .map(|(index, estimate)| {
            estimate.ok_or_else(|| {
                QsbError::Data(
                    ErrorInfo::new("observable-not-measured", "layout never reads this observable")
                        .with_context("index", index.to_string()),
                )
            })
        })
        .collect()
}

fn update_static(state: ProtocolState, chunk: RawDatasetChunk) -> Result<ProtocolState, QsbError> {
    Ok(state.absorb(chunk)?.with_converged(true))
}

/// One setting per observable, uniform shot split.
#[derive(Debug, Clone, Default)]
pub struct DirectNaive {
    options: ProtocolOptions,
}

impl DirectNaive {
    /// Creates the protocol.
    pub fn new(options: ProtocolOptions) -> Self {
        Self { options }
    }
}

impl Protocol for DirectNaive {
    fn id(&self) -> &str {
        DIRECT_NAIVE
    }

    fn initialize(&self, set: Arc<ObservableSet>, budget: usize, seed: u64) -> Result<ProtocolState, QsbError> {
        let layout = per_observable_layout(&set);
        Ok(ProtocolState::new(set, budget, seed, layout))
    }

    fn plan(&self, state: &ProtocolState) -> Result<MeasurementPlan, QsbError> {
        plan_with(state, uniform_split(state.remaining_budget(), state.layout().len()))
    }

    fn acquire(
        &self,
        circuit: &CircuitSpec,
        plan: &MeasurementPlan,
        sampler: &dyn Sampler,
        seed: u64,
    ) -> Result<RawDatasetChunk, QsbError> {
        acquire_fixed(circuit, plan, sampler, seed)
    }

    fn update(&self, state: ProtocolState, chunk: RawDatasetChunk) -> Result<ProtocolState, QsbError> {
        update_static(state, chunk)
    }

    fn finalize(&self, state: &ProtocolState, set: &ObservableSet) -> Result<Vec<ObservableEstimate>, QsbError> {
        finalize_fixed(state, set, &self.options)
    }
}

/// One setting per commuting group, uniform shot split. Required baseline.
#[derive(Debug, Clone, Default)]
pub struct DirectGrouped {
    options: ProtocolOptions,
}

impl DirectGrouped {
    /// Creates the protocol.
    pub fn new(options: ProtocolOptions) -> Self {
        Self { options }
    }
}

impl Protocol for DirectGrouped {
    fn id(&self) -> &str {
        DIRECT_GROUPED
    }

    fn initialize(&self, set: Arc<ObservableSet>, budget: usize, seed: u64) -> Result<ProtocolState, QsbError> {
        let layout = grouped_layout(&set, &self.options)?;
        Ok(ProtocolState::new(set, budget, seed, layout))
    }

    fn plan(&self, state: &ProtocolState) -> Result<MeasurementPlan, QsbError> {
        plan_with(state, uniform_split(state.remaining_budget(), state.layout().len()))
    }

    fn acquire(
        &self,
        circuit: &CircuitSpec,
        plan: &MeasurementPlan,
        sampler: &dyn Sampler,
        seed: u64,
    ) -> Result<RawDatasetChunk, QsbError> {
        acquire_fixed(circuit, plan, sampler, seed)
    }

    fn update(&self, state: ProtocolState, chunk: RawDatasetChunk) -> Result<ProtocolState, QsbError> {
        update_static(state, chunk)
    }

    fn finalize(&self, state: &ProtocolState, set: &ObservableSet) -> Result<Vec<ObservableEstimate>, QsbError> {
        finalize_fixed(state, set, &self.options)
    }
}

/// Commuting groups with a weighted shot split.
#[derive(Debug, Clone, Default)]
pub struct DirectOptimized {
    options: ProtocolOptions,
}

impl DirectOptimized {
    /// Creates the protocol.
    pub fn new(options: ProtocolOptions) -> Self {
        Self { options }
    }
}

impl Protocol for DirectOptimized {
    fn id(&self) -> &str {
        DIRECT_OPTIMIZED
    }

    fn initialize(&self, set: Arc<ObservableSet>, budget: usize, seed: u64) -> Result<ProtocolState, QsbError> {
        let layout = grouped_layout(&set, &self.options)?;
        Ok(ProtocolState::new(set, budget, seed, layout))
    }

    fn plan(&self, state: &ProtocolState) -> Result<MeasurementPlan, QsbError> {
        let policy = self.options.allocation;
        let weights: Vec<f64> = state
            .layout()
            .iter()
            .map(|setting| policy.weight(setting.observables.len()))
            .collect();
        let shots = weighted_split(state.remaining_budget(), &weights);
        debug!(policy = policy.as_str(), ?shots, "weighted allocation");
        plan_with(state, shots)
    }

    fn acquire(
        &self,
        circuit: &CircuitSpec,
        plan: &MeasurementPlan,
        sampler: &dyn Sampler,
        seed: u64,
    ) -> Result<RawDatasetChunk, QsbError> {
        acquire_fixed(circuit, plan, sampler, seed)
    }

    fn update(&self, state: ProtocolState, chunk: RawDatasetChunk) -> Result<ProtocolState, QsbError> {
        update_static(state, chunk)
    }

    fn finalize(&self, state: &ProtocolState, set: &ObservableSet) -> Result<Vec<ObservableEstimate>, QsbError> {
        finalize_fixed(state, set, &self.options)
    }
}
