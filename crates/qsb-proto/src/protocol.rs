use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use qsb_core::{ErrorInfo, QsbError};
use qsb_obs::{GroupingMethod, ObservableSet};
use qsb_stats::CiSpec;
use serde::{Deserialize, Serialize};

use crate::estimate::ObservableEstimate;
use crate::plan::MeasurementPlan;
use crate::sampler::{CircuitSpec, Sampler};
use crate::state::{ProtocolState, RawDatasetChunk};

/// Shot weighting across groups for the optimized direct protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Weight by `sqrt(group size)`.
    #[default]
    Proportional,
    /// Same weights as `Proportional`.
    EqualSe,
    /// Weight by raw group size.
    MaxMin,
}

impl AllocationPolicy {
    /// Stable label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationPolicy::Proportional => "proportional",
            AllocationPolicy::EqualSe => "equal_se",
            AllocationPolicy::MaxMin => "max_min",
        }
    }

    /// Unnormalised weight of a group with `group_size` members.
    pub fn weight(&self, group_size: usize) -> f64 {
        match self {
            AllocationPolicy::Proportional | AllocationPolicy::EqualSe => {
                (group_size as f64).sqrt()
            }
            AllocationPolicy::MaxMin => group_size as f64,
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationPolicy {
    type Err = QsbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "proportional" => Ok(AllocationPolicy::Proportional),
            "equal_se" => Ok(AllocationPolicy::EqualSe),
            "max_min" => Ok(AllocationPolicy::MaxMin),
            other => Err(QsbError::Config(
                ErrorInfo::new("unknown-allocation-policy", "unsupported allocation policy")
                    .with_context("policy", other)
                    .with_hint("use proportional, equal_se or max_min"),
            )),
        }
    }
}

fn default_ci() -> Option<CiSpec> {
    Some(CiSpec::default())
}

/// Knobs shared by the built-in protocols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolOptions {
    /// Partition method for grouped direct protocols.
    #[serde(default)]
    pub grouping: GroupingMethod,
    /// Shot weighting for `direct_optimized`.
    #[serde(default)]
    pub allocation: AllocationPolicy,
    /// Per-observable interval attached in `finalize`; `None` skips it.
    #[serde(default = "default_ci")]
    pub ci: Option<CiSpec>,
    /// Median-of-means group count for shadow estimates.
    #[serde(default)]
    pub median_of_means: Option<usize>,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            grouping: GroupingMethod::default(),
            allocation: AllocationPolicy::default(),
            ci: default_ci(),
            median_of_means: None,
        }
    }
}

impl ProtocolOptions {
    /// Fails fast on invalid interval settings.
    pub fn validate(&self) -> Result<(), QsbError> {
        if let Some(ci) = &self.ci {
            ci.validate()?;
        }
        Ok(())
    }
}

/// Five-operation measurement contract.
///
/// The driving loop calls `initialize` once, then `plan → acquire → update`
/// until the budget is spent, the state converges or the plan is empty, then
/// `finalize` once.
pub trait Protocol: Send + Sync {
    /// Registry identifier.
    fn id(&self) -> &str;

    /// Builds the run state and its setting layout.
    fn initialize(
        &self,
        set: Arc<ObservableSet>,
        budget: usize,
        seed: u64,
    ) -> Result<ProtocolState, QsbError>;

    /// Shots for the next round; never more than the remaining budget.
    fn plan(&self, state: &ProtocolState) -> Result<MeasurementPlan, QsbError>;

    /// Executes a plan through the sampler.
    fn acquire(
        &self,
        circuit: &CircuitSpec,
        plan: &MeasurementPlan,
        sampler: &dyn Sampler,
        seed: u64,
    ) -> Result<RawDatasetChunk, QsbError>;

    /// Appends a chunk and returns the advanced state.
    fn update(
        &self,
        state: ProtocolState,
        chunk: RawDatasetChunk,
    ) -> Result<ProtocolState, QsbError>;

    /// Reduces accumulated outcomes to one estimate per observable.
    fn finalize(
        &self,
        state: &ProtocolState,
        set: &ObservableSet,
    ) -> Result<Vec<ObservableEstimate>, QsbError>;
}

/// Rejects a `finalize` call whose set differs from the one the state was built on.
pub(crate) fn ensure_same_set(state: &ProtocolState, set: &ObservableSet) -> Result<(), QsbError> {
    if state.observable_set().as_ref() == set {
        return Ok(());
    }
    Err(QsbError::Data(
        ErrorInfo::new("observable-set-mismatch", "finalize received a different observable set")
            .with_context("state_observables", state.observable_set().len().to_string())
            .with_context("given_observables", set.len().to_string()),
    ))
}
