use std::fs;
use std::path::Path;
use std::sync::Arc;

use qsb_adapt::AdaptiveConfig;
use qsb_core::{stable_hash_string, ErrorInfo, QsbError};
use qsb_obs::{Observable, ObservableSet};
use qsb_proto::{
    CircuitSpec, ProtocolOptions, ProtocolRegistry, CLASSICAL_SHADOWS, DIRECT_GROUPED, DIRECT_NAIVE,
    DIRECT_OPTIMIZED,
};
use qsb_sim::StatevectorSampler;
use qsb_task::NStarTask;
use serde::{Deserialize, Serialize};

fn yaml_error(code: &str, err: impl ToString) -> QsbError {
    QsbError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Scheduler configuration for the sweep pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    /// Worker threads of the sweep pool.
    #[serde(default = "Scheduler::default_parallelism")]
    pub parallelism: usize,
}

impl Scheduler {
    const fn default_parallelism() -> usize {
        1
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            parallelism: Self::default_parallelism(),
        }
    }
}

/// Threshold sweep of the adaptive selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSpec {
    /// Shots per protocol per exploration step.
    pub batch_size: usize,
    /// Commit thresholds to sweep.
    pub thresholds: Vec<f64>,
    /// Monte-Carlo draws per P(best) estimate.
    #[serde(default = "AdaptiveSpec::default_n_mc")]
    pub n_mc: usize,
    /// Shots for exploration and exploitation combined; defaults to the largest sweep budget.
    #[serde(default)]
    pub total_budget: Option<usize>,
    /// Candidate protocols; defaults to every configured protocol.
    #[serde(default)]
    pub protocols: Vec<String>,
}

impl AdaptiveSpec {
    const fn default_n_mc() -> usize {
        2000
    }

    /// Selector configuration at the first threshold.
    pub fn selector_config(&self, default_budget: usize) -> AdaptiveConfig {
        AdaptiveConfig {
            batch_size: self.batch_size,
            threshold: self.thresholds.first().copied().unwrap_or(f64::NAN),
            n_mc: self.n_mc,
            total_budget: self.total_budget.unwrap_or(default_budget),
        }
    }
}

/// Complete description of one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Benchmark name carried into reports.
    #[serde(default = "BenchmarkConfig::default_name")]
    pub name: String,
    /// Observables on a common register.
    pub observables: Vec<Observable>,
    /// State handed to the sampler.
    pub circuit: CircuitSpec,
    /// Protocol ids to benchmark.
    #[serde(default = "BenchmarkConfig::default_protocols")]
    pub protocols: Vec<String>,
    /// Options shared by the built-in protocols.
    #[serde(default)]
    pub protocol_options: ProtocolOptions,
    /// Total shot budgets to sweep.
    pub budgets: Vec<usize>,
    /// Replicates per `(protocol, budget)`.
    #[serde(default = "BenchmarkConfig::default_replicates")]
    pub replicates: u64,
    /// Master seed.
    #[serde(default)]
    pub seed: u64,
    /// Reference protocol for shot-savings factors and dominance.
    #[serde(default = "BenchmarkConfig::default_baseline")]
    pub baseline: String,
    /// N* task evaluated over the sweep rows.
    #[serde(default)]
    pub task: Option<NStarTask>,
    /// Adaptive selector sweep.
    #[serde(default)]
    pub adaptive: Option<AdaptiveSpec>,
    /// Sweep pool settings.
    #[serde(default)]
    pub scheduler: Scheduler,
    /// Symmetric readout flip probability of the reference sampler.
    #[serde(default)]
    pub readout_error: f64,
    /// Replays every stored run at its full budget and compares estimates.
    #[serde(default = "BenchmarkConfig::default_verify")]
    pub verify: bool,
}

impl BenchmarkConfig {
    fn default_name() -> String {
        "qsb-benchmark".to_string()
    }

    fn default_protocols() -> Vec<String> {
        [DIRECT_NAIVE, DIRECT_GROUPED, DIRECT_OPTIMIZED, CLASSICAL_SHADOWS]
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    const fn default_replicates() -> u64 {
        10
    }

    fn default_baseline() -> String {
        DIRECT_GROUPED.to_string()
    }

    const fn default_verify() -> bool {
        true
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, QsbError> {
        serde_yaml::from_str(text).map_err(|err| yaml_error("yaml-deserialize", err))
    }

    /// Canonical YAML rendering.
    pub fn to_yaml_string(&self) -> Result<String, QsbError> {
        serde_yaml::to_string(self).map_err(|err| yaml_error("yaml-serialize", err))
    }

    /// Stable hash of the configuration contents.
    pub fn config_hash(&self) -> Result<String, QsbError> {
        stable_hash_string(self)
    }

    /// Validated observable set.
    pub fn observable_set(&self) -> Result<Arc<ObservableSet>, QsbError> {
        ObservableSet::new(self.observables.clone()).map(Arc::new)
    }

    /// Protocol registry built from the shared options.
    pub fn registry(&self) -> ProtocolRegistry {
        ProtocolRegistry::with_defaults(&self.protocol_options)
    }

    /// Reference sampler with the configured readout noise.
    pub fn sampler(&self) -> Result<StatevectorSampler, QsbError> {
        StatevectorSampler::with_readout_error(self.readout_error)
    }

    /// Largest budget of the sweep.
    pub fn max_budget(&self) -> usize {
        self.budgets.iter().copied().max().unwrap_or(0)
    }

    /// Adaptive candidates: the explicit list or every configured protocol.
    pub fn adaptive_candidates(&self) -> Vec<String> {
        match &self.adaptive {
            Some(spec) if !spec.protocols.is_empty() => spec.protocols.clone(),
            _ => self.protocols.clone(),
        }
    }

    /// Fails fast on every configuration error before any shot is spent.
    pub fn validate(&self) -> Result<(), QsbError> {
        let set = self.observable_set()?;
        self.circuit.validate()?;
        if self.circuit.num_qubits != set.num_qubits() {
            return Err(QsbError::Config(
                ErrorInfo::new("circuit-qubit-mismatch", "circuit and observables disagree on register size")
                    .with_context("circuit", self.circuit.num_qubits.to_string())
                    .with_context("observables", set.num_qubits().to_string()),
            ));
        }
        if self.budgets.is_empty() || self.budgets.contains(&0) {
            return Err(QsbError::Config(
                ErrorInfo::new("invalid-budget", "budgets must be a non-empty list of positive shot counts")
                    .with_context("budgets", format!("{:?}", self.budgets)),
            ));
        }
        if self.replicates == 0 {
            return Err(QsbError::config("invalid-replicates", "replicates must be at least 1"));
        }
        if self.scheduler.parallelism == 0 {
            return Err(QsbError::config("invalid-parallelism", "scheduler.parallelism must be at least 1"));
        }
        if self.protocols.is_empty() {
            return Err(QsbError::config("empty-protocols", "at least one protocol must be configured"));
        }
        self.protocol_options.validate()?;
        let registry = self.registry();
        for id in &self.protocols {
            registry.get(id)?;
        }
        if !self.protocols.contains(&self.baseline) {
            return Err(QsbError::Config(
                ErrorInfo::new("missing-baseline", "baseline protocol is not benchmarked")
                    .with_context("baseline", self.baseline.clone())
                    .with_hint("add the baseline to protocols"),
            ));
        }
        self.sampler()?;
        if let Some(task) = &self.task {
            task.validate()?;
        }
        if let Some(spec) = &self.adaptive {
            if spec.thresholds.is_empty() {
                return Err(QsbError::config("invalid-threshold", "adaptive.thresholds must not be empty"));
            }
            let candidates = self.adaptive_candidates();
            for id in &candidates {
                if !self.protocols.contains(id) {
                    return Err(QsbError::Config(
                        ErrorInfo::new("unknown-protocol", "adaptive candidate is not benchmarked")
                            .with_context("protocol", id.clone()),
                    ));
                }
            }
            let base = spec.selector_config(self.max_budget());
            for threshold in &spec.thresholds {
                base.with_threshold(*threshold).validate(candidates.len())?;
            }
        }
        Ok(())
    }
}

/// Loads and validates a YAML benchmark configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BenchmarkConfig, QsbError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| {
        QsbError::Serde(
            ErrorInfo::new("config-read", err.to_string()).with_context("path", path.display().to_string()),
        )
    })?;
    let config = BenchmarkConfig::from_yaml_str(&text)?;
    config.validate()?;
    Ok(config)
}
