use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_adapt::{reestimate_prefix, RawShotStore};
use qsb_core::{derive_labelled_seed, derive_run_seed, ErrorInfo, QsbError};
use qsb_obs::ObservableSet;
use qsb_proto::{run_protocol, ObservableEstimate, ProtocolRegistry, ProtocolRun, RoundDiagnostics, Sampler};
use qsb_task::BudgetRow;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BenchmarkConfig;

pub(crate) fn pool_error(err: impl ToString) -> QsbError {
    QsbError::Config(ErrorInfo::new("thread-pool", err.to_string()))
}

/// Finalized output of one `(protocol, budget, replicate)` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Protocol id.
    pub protocol_id: String,
    /// Total shot budget.
    pub n_total: usize,
    /// Replicate index.
    pub replicate_id: u64,
    /// Run seed.
    pub seed: u64,
    /// Shots actually acquired.
    pub shots_acquired: usize,
    /// Estimates in observable order.
    pub estimates: Vec<ObservableEstimate>,
    /// Per-round diagnostics.
    pub rounds: Vec<RoundDiagnostics>,
}

impl JobOutcome {
    /// One budget row per estimate, attaching the truth when known.
    pub fn rows(&self, truth: &BTreeMap<String, f64>) -> Vec<BudgetRow> {
        self.estimates
            .iter()
            .map(|estimate| BudgetRow {
                protocol_id: self.protocol_id.clone(),
                n_total: self.n_total,
                replicate_id: self.replicate_id,
                observable_id: estimate.observable_id.clone(),
                estimate: estimate.estimate,
                standard_error: estimate.standard_error,
                truth: truth.get(&estimate.observable_id).copied(),
            })
            .collect()
    }
}

/// Everything a sweep produced.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    /// Jobs ordered by protocol, budget, then replicate.
    pub jobs: Vec<JobOutcome>,
    /// Raw shots of every run at the largest budget.
    pub store: RawShotStore,
}

impl SweepOutput {
    /// Flattened budget rows.
    pub fn rows(&self, truth: &BTreeMap<String, f64>) -> Vec<BudgetRow> {
        self.jobs.iter().flat_map(|job| job.rows(truth)).collect()
    }
}

/// Seed of one sweep run: protocol-labelled, then replicate and budget index.
pub fn job_seed(master_seed: u64, protocol_id: &str, replicate_id: u64, budget_index: usize) -> u64 {
    derive_run_seed(derive_labelled_seed(master_seed, protocol_id), replicate_id, budget_index as u64)
}

struct JobSpec {
    protocol_id: String,
    n_total: usize,
    budget_index: usize,
    replicate_id: u64,
}

fn enumerate_jobs(config: &BenchmarkConfig, budgets: &[usize]) -> Vec<JobSpec> {
    let mut jobs = Vec::new();
    for protocol_id in &config.protocols {
        for (budget_index, n_total) in budgets.iter().enumerate() {
            for replicate_id in 0..config.replicates {
                jobs.push(JobSpec {
                    protocol_id: protocol_id.clone(),
                    n_total: *n_total,
                    budget_index,
                    replicate_id,
                });
            }
        }
    }
    jobs
}

/// Sorted, de-duplicated sweep budgets.
pub fn sweep_budgets(config: &BenchmarkConfig) -> Vec<usize> {
    let mut budgets = config.budgets.clone();
    budgets.sort_unstable();
    budgets.dedup();
    budgets
}

/// Runs every `(protocol, budget, replicate)` job on a pool of
/// `scheduler.parallelism` threads. Runs at the largest budget are kept in
/// the raw-shot store.
pub fn run_sweep(
    config: &BenchmarkConfig,
    set: &Arc<ObservableSet>,
    registry: &ProtocolRegistry,
    sampler: &dyn Sampler,
) -> Result<SweepOutput, QsbError> {
    let budgets = sweep_budgets(config);
    let max_budget = budgets.last().copied().unwrap_or(0);
    let jobs = enumerate_jobs(config, &budgets);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.scheduler.parallelism.max(1))
        .build()
        .map_err(pool_error)?;
    info!(
        jobs = jobs.len(),
        parallelism = config.scheduler.parallelism,
        "dispatching sweep"
    );

    let results: Result<Vec<(JobOutcome, Option<ProtocolRun>)>, QsbError> = pool.install(|| {
        jobs.par_iter()
            .map(|job| -> Result<(JobOutcome, Option<ProtocolRun>), QsbError> {
                let protocol = registry.get(&job.protocol_id)?;
                let seed = job_seed(config.seed, &job.protocol_id, job.replicate_id, job.budget_index);
                let run = run_protocol(protocol.as_ref(), Arc::clone(set), &config.circuit, sampler, job.n_total, seed)?;
                debug!(
                    protocol = %job.protocol_id,
                    budget = job.n_total,
                    replicate = job.replicate_id,
                    rounds = run.rounds.len(),
                    "sweep job complete"
                );
                let outcome = JobOutcome {
                    protocol_id: job.protocol_id.clone(),
                    n_total: job.n_total,
                    replicate_id: job.replicate_id,
                    seed,
                    shots_acquired: run.shots_acquired(),
                    estimates: run.estimates.clone(),
                    rounds: run.rounds.clone(),
                };
                let keep = (job.n_total == max_budget).then_some(run);
                Ok((outcome, keep))
            })
            .collect()
    });

    let mut store = RawShotStore::new();
    let mut outcomes = Vec::with_capacity(jobs.len());
    for (outcome, run) in results? {
        if let Some(run) = run {
            store.insert_run(&run, outcome.replicate_id);
        }
        outcomes.push(outcome);
    }
    Ok(SweepOutput {
        jobs: outcomes,
        store,
    })
}

/// Outcome of replaying stored runs at their full budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Stored runs replayed.
    pub checked: usize,
    /// Runs whose replayed estimates differ from the originals.
    pub mismatches: usize,
}

fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-12
}

/// Replays every stored run with `frac = 1` and compares each estimate and
/// standard error with the sweep's own result at the largest budget.
pub fn verify_full_budget(
    output: &SweepOutput,
    set: &Arc<ObservableSet>,
    registry: &ProtocolRegistry,
) -> Result<VerificationSummary, QsbError> {
    let mut summary = VerificationSummary::default();
    let max_budget = output.jobs.iter().map(|job| job.n_total).max().unwrap_or(0);
    for stored in output.store.runs() {
        let Some(job) = output.jobs.iter().find(|job| {
            job.protocol_id == stored.protocol_id
                && job.replicate_id == stored.replicate_id
                && job.n_total == max_budget
        }) else {
            continue;
        };
        let protocol = registry.get(&stored.protocol_id)?;
        let records = output.store.records(&stored.protocol_id, stored.replicate_id);
        let replayed = reestimate_prefix(protocol.as_ref(), Arc::clone(set), &records, 1.0, job.seed)?;
        let matches = replayed.len() == job.estimates.len()
            && replayed.iter().zip(&job.estimates).all(|(again, original)| {
                again.observable_id == original.observable_id
                    && same_value(again.estimate, original.estimate)
                    && same_value(again.standard_error, original.standard_error)
            });
        summary.checked += 1;
        if !matches {
            summary.mismatches += 1;
            warn!(
                protocol = %stored.protocol_id,
                replicate = stored.replicate_id,
                "full-budget replay disagrees with the sweep estimate"
            );
        }
    }
    Ok(summary)
}
