use std::collections::BTreeMap;

use qsb_core::{ErrorInfo, QsbError};
use qsb_stats::mean;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::criterion::Criterion;
use crate::rows::{index_rows, BudgetRow};

/// How a replicate's observable metrics collapse to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Worst observable must meet ε.
    #[default]
    WorstCase,
    /// Mean over observables must meet ε.
    AverageCase,
}

impl Aggregation {
    /// Stable label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::WorstCase => "worst_case",
            Aggregation::AverageCase => "average_case",
        }
    }

    fn collapse(&self, metrics: &[f64]) -> f64 {
        if metrics.is_empty() || metrics.iter().any(|m| !m.is_finite()) {
            return f64::INFINITY;
        }
        match self {
            Aggregation::WorstCase => metrics.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::AverageCase => mean(metrics),
        }
    }
}

fn default_delta() -> f64 {
    0.05
}

/// Minimal-budget search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NStarTask {
    /// Target precision.
    pub epsilon: f64,
    /// Allowed failure probability across replicates.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Metric per observable.
    #[serde(default)]
    pub criterion: Criterion,
    /// Collapse rule per replicate.
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl NStarTask {
    /// Worst-case task.
    pub fn worst_case(epsilon: f64, delta: f64, criterion: Criterion) -> Self {
        Self {
            epsilon,
            delta,
            criterion,
            aggregation: Aggregation::WorstCase,
        }
    }

    /// Average-case task.
    pub fn average_case(epsilon: f64, delta: f64, criterion: Criterion) -> Self {
        Self {
            epsilon,
            delta,
            criterion,
            aggregation: Aggregation::AverageCase,
        }
    }

    /// Fails fast on non-positive ε, δ outside `[0, 1)` or an invalid criterion.
    pub fn validate(&self) -> Result<(), QsbError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(QsbError::Config(
                ErrorInfo::new("invalid-task-parameter", "epsilon must be positive and finite")
                    .with_context("epsilon", self.epsilon.to_string()),
            ));
        }
        if !(0.0..1.0).contains(&self.delta) {
            return Err(QsbError::Config(
                ErrorInfo::new("invalid-task-parameter", "delta must lie in [0, 1)")
                    .with_context("delta", self.delta.to_string()),
            ));
        }
        self.criterion.validate()
    }

    /// Runs the ascending-budget search for one protocol.
    pub fn evaluate(&self, rows: &[BudgetRow], protocol_id: &str) -> Result<NStarResult, QsbError> {
        self.validate()?;
        let index = index_rows(rows, protocol_id);
        let target = 1.0 - self.delta;
        let mut success_fraction = BTreeMap::new();
        let mut n_star = None;
        for (n_total, replicates) in &index {
            let mut successes = 0usize;
            for replicate_rows in replicates.values() {
                let metrics = self.criterion.replicate_metrics(replicate_rows)?;
                if self.aggregation.collapse(&metrics) <= self.epsilon {
                    successes += 1;
                }
            }
            let fraction = successes as f64 / replicates.len() as f64;
            success_fraction.insert(*n_total, fraction);
            if n_star.is_none() && fraction >= target {
                n_star = Some(*n_total);
            }
        }
        debug!(
            protocol = protocol_id,
            aggregation = self.aggregation.as_str(),
            criterion = self.criterion.as_str(),
            epsilon = self.epsilon,
            ?n_star,
            "n* search complete"
        );
        Ok(NStarResult {
            protocol_id: protocol_id.to_string(),
            n_star,
            success_fraction,
        })
    }
}

/// Outcome of an N* search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NStarResult {
    /// Protocol id.
    pub protocol_id: String,
    /// First budget whose success fraction reaches `1 − δ`.
    pub n_star: Option<usize>,
    /// Success fraction per evaluated budget.
    pub success_fraction: BTreeMap<usize, f64>,
}

/// `N*_baseline / N*_candidate`; `None` when either is missing, `+inf` when
/// the candidate needs no shots.
pub fn shot_savings_factor(baseline: Option<usize>, candidate: Option<usize>) -> Option<f64> {
    match (baseline, candidate) {
        (Some(_), Some(0)) => Some(f64::INFINITY),
        (Some(base), Some(cand)) => Some(base as f64 / cand as f64),
        _ => None,
    }
}
