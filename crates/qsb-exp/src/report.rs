use std::collections::BTreeMap;

use chrono::Utc;
use qsb_adapt::RegretStudy;
use qsb_core::{RunProvenance, SchemaVersion};
use qsb_stats::{construct_simultaneous_cis, DistributionSummary, FwerMethod};
use qsb_task::{BudgetBiasVariance, DominanceResult, PowerLawFit, TaskEvaluation};
use serde::{Deserialize, Serialize};

use crate::sweep::{JobOutcome, VerificationSummary};

/// Schema of [`BenchmarkReport`].
pub const REPORT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Family-wise level used for the simultaneous-coverage column.
pub const COVERAGE_ALPHA: f64 = 0.05;

/// Replicate distribution of one protocol at one budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// Protocol id.
    pub protocol_id: String,
    /// Total shot budget.
    pub n_total: usize,
    /// Replicates summarised.
    pub replicates: usize,
    /// `|estimate − truth|` over every observable and replicate.
    pub abs_error: DistributionSummary,
    /// Standard errors over every observable and replicate.
    pub standard_error: DistributionSummary,
    /// Fraction of per-observable intervals containing the truth.
    pub ci_coverage: Option<f64>,
    /// Fraction of replicates whose Bonferroni intervals all contain the truth.
    pub simultaneous_coverage: Option<f64>,
}

impl BudgetSummary {
    /// Summarises the jobs of one `(protocol, budget)` cell.
    pub fn from_jobs(protocol_id: &str, n_total: usize, jobs: &[&JobOutcome], truth: &BTreeMap<String, f64>) -> Self {
        let mut abs_errors = Vec::new();
        let mut standard_errors = Vec::new();
        let mut ci_hits = 0usize;
        let mut ci_total = 0usize;
        let mut family_hits = 0usize;
        let mut family_total = 0usize;
        for job in jobs {
            for estimate in &job.estimates {
                standard_errors.push(estimate.standard_error);
                let Some(value) = truth.get(&estimate.observable_id) else {
                    continue;
                };
                abs_errors.push((estimate.estimate - value).abs());
                if let Some(interval) = &estimate.confidence_interval {
                    ci_total += 1;
                    if interval.contains(*value) {
                        ci_hits += 1;
                    }
                }
            }
            let truths: Option<Vec<f64>> = job
                .estimates
                .iter()
                .map(|estimate| truth.get(&estimate.observable_id).copied())
                .collect();
            if let (Some(truths), Ok(family)) = (
                truths,
                construct_simultaneous_cis(&job.estimates, COVERAGE_ALPHA, FwerMethod::Bonferroni),
            ) {
                family_total += 1;
                if family.all_contain(&truths) {
                    family_hits += 1;
                }
            }
        }
        let fraction = |hits: usize, total: usize| (total > 0).then(|| hits as f64 / total as f64);
        Self {
            protocol_id: protocol_id.to_string(),
            n_total,
            replicates: jobs.len(),
            abs_error: DistributionSummary::from_values(&abs_errors),
            standard_error: DistributionSummary::from_values(&standard_errors),
            ci_coverage: fraction(ci_hits, ci_total),
            simultaneous_coverage: fraction(family_hits, family_total),
        }
    }
}

/// Per-budget bias-variance decomposition and its power-law fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingSummary {
    /// Protocol id.
    pub protocol_id: String,
    /// Decomposition per budget.
    pub budgets: Vec<BudgetBiasVariance>,
    /// `RMSE ≈ A·N^b`.
    pub fit: PowerLawFit,
}

/// Full benchmark artefact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Report schema.
    pub schema: SchemaVersion,
    /// Benchmark name.
    pub name: String,
    /// Hashes, seed and timestamp.
    pub provenance: RunProvenance,
    /// Exact expectation per observable.
    pub truth: BTreeMap<String, f64>,
    /// One entry per `(protocol, budget)`, ordered by protocol then budget.
    pub summaries: Vec<BudgetSummary>,
    /// Bias-variance scaling per protocol.
    pub scaling: Vec<ScalingSummary>,
    /// Dominance of each protocol over the baseline.
    pub dominance: Vec<DominanceResult>,
    /// N* and shot-savings factors.
    pub task: Option<TaskEvaluation>,
    /// Adaptive threshold sweep.
    pub adaptive: Option<RegretStudy>,
    /// Full-budget replay check.
    pub verification: Option<VerificationSummary>,
}

/// Provenance stamped with the current UTC time.
pub fn provenance(config_hash: String, observables_hash: String, seed: u64) -> RunProvenance {
    RunProvenance::new(config_hash, observables_hash, seed)
        .created_at(Utc::now().to_rfc3339())
        .with_tool("qsb-exp", env!("CARGO_PKG_VERSION"))
}
