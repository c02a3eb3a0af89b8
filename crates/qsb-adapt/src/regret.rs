use qsb_core::{derive_run_seed, QsbError, RngHandle};
use qsb_stats::mean;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::posterior::argmin_first;
use crate::selector::{AdaptiveConfig, AdaptiveSelector};
use crate::source::ErrorSource;

/// One adaptive run compared with the full-budget oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegretRecord {
    /// Commit threshold.
    pub threshold: f64,
    /// Position of the threshold in the sweep.
    pub threshold_index: usize,
    /// Replicate index.
    pub replicate_id: u64,
    /// Selected protocol id.
    pub selected: String,
    /// Best protocol at the full budget on this replicate; `None` without data.
    pub oracle: Option<String>,
    /// Commit step.
    pub commit_step: usize,
    /// Whether the step cap forced the commit.
    pub forced: bool,
    /// Shots spent exploring.
    pub exploration_shots: usize,
    /// Shots of the selected protocol after exploitation.
    pub final_shots: usize,
    /// Mean absolute error of the selection at `final_shots`.
    pub final_quality: f64,
    /// Mean absolute error of the oracle at the full budget.
    pub oracle_quality: f64,
    /// `final_quality − oracle_quality`.
    pub regret: f64,
}

/// Aggregates of the runs at one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSummary {
    /// Commit threshold.
    pub threshold: f64,
    /// Number of replicates.
    pub n_runs: usize,
    /// Fraction of runs selecting their replicate's oracle.
    pub accuracy: f64,
    /// Fraction of runs selecting the study-wide oracle.
    pub pooled_accuracy: f64,
    /// Mean regret over runs with a finite regret.
    pub mean_regret: f64,
    /// Mean commit step.
    pub mean_commit_step: f64,
    /// Mean exploration shots.
    pub mean_exploration_shots: f64,
    /// Fraction of commits forced by the step cap.
    pub forced_commit_rate: f64,
}

impl ThresholdSummary {
    fn from_records(threshold: f64, records: &[&RegretRecord], pooled_oracle: Option<&str>) -> Self {
        let n = records.len();
        let fraction = |hit: &dyn Fn(&RegretRecord) -> bool| {
            if n == 0 {
                f64::NAN
            } else {
                records.iter().filter(|r| hit(**r)).count() as f64 / n as f64
            }
        };
        let finite_regrets: Vec<f64> = records
            .iter()
            .map(|r| r.regret)
            .filter(|r| r.is_finite())
            .collect();
        Self {
            threshold,
            n_runs: n,
            accuracy: fraction(&|r| r.oracle.as_deref() == Some(r.selected.as_str())),
            pooled_accuracy: fraction(&|r| pooled_oracle == Some(r.selected.as_str())),
            mean_regret: mean(&finite_regrets),
            mean_commit_step: mean(&records.iter().map(|r| r.commit_step as f64).collect::<Vec<_>>()),
            mean_exploration_shots: mean(
                &records
                    .iter()
                    .map(|r| r.exploration_shots as f64)
                    .collect::<Vec<_>>(),
            ),
            forced_commit_rate: fraction(&|r| r.forced),
        }
    }
}

/// Every run of a threshold sweep plus per-threshold summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegretStudy {
    /// Runs ordered by threshold, then replicate.
    pub records: Vec<RegretRecord>,
    /// One summary per threshold, in sweep order.
    pub summaries: Vec<ThresholdSummary>,
    /// Lowest mean full-budget quality across replicates.
    pub pooled_oracle: Option<String>,
}

/// Candidate whose full-budget quality, averaged over the replicates where it
/// is finite, is lowest.
fn study_oracle(
    source: &dyn ErrorSource,
    candidates: &[String],
    total_budget: usize,
    replicates: &[u64],
) -> Result<Option<String>, QsbError> {
    let mut pooled = Vec::with_capacity(candidates.len());
    for id in candidates {
        let mut qualities = Vec::with_capacity(replicates.len());
        for replicate in replicates {
            let quality = source.quality(id, total_budget, *replicate)?;
            if quality.is_finite() {
                qualities.push(quality);
            }
        }
        pooled.push(mean(&qualities));
    }
    Ok(argmin_first(&pooled)
        .filter(|i| !pooled[*i].is_nan())
        .map(|i| candidates[i].clone()))
}

/// Runs the adaptive selector for every `(threshold, replicate)` pair.
///
/// Run `(i, r)` draws from its own RNG seeded with
/// `derive_run_seed(master_seed, r, i)`. Runs execute on the current rayon
/// pool and are returned in sweep order. Regret is measured against the
/// replicate's own oracle; the study-wide oracle feeds `pooled_accuracy`.
pub fn run_regret_study(
    source: &dyn ErrorSource,
    candidates: &[String],
    config: &AdaptiveConfig,
    thresholds: &[f64],
    replicates: &[u64],
    master_seed: u64,
) -> Result<RegretStudy, QsbError> {
    for threshold in thresholds {
        config.with_threshold(*threshold).validate(candidates.len())?;
    }
    let jobs: Vec<(usize, u64)> = (0..thresholds.len())
        .flat_map(|index| replicates.iter().map(move |r| (index, *r)))
        .collect();

    let records = jobs
        .par_iter()
        .map(|&(threshold_index, replicate_id)| -> Result<RegretRecord, QsbError> {
            let threshold = thresholds[threshold_index];
            let mut rng = RngHandle::from_seed(derive_run_seed(master_seed, replicate_id, threshold_index as u64));
            let selector = AdaptiveSelector::new(config.with_threshold(threshold), candidates.to_vec())?;
            let outcome = selector.run(source, replicate_id, &mut rng)?;

            let oracle_qualities = candidates
                .iter()
                .map(|id| source.quality(id, config.total_budget, replicate_id))
                .collect::<Result<Vec<_>, QsbError>>()?;
            let oracle_index = argmin_first(&oracle_qualities).filter(|i| !oracle_qualities[*i].is_nan());
            let oracle_quality = oracle_index.map_or(f64::NAN, |i| oracle_qualities[i]);
            let final_quality = source.quality(&outcome.selected, outcome.final_shots, replicate_id)?;

            Ok(RegretRecord {
                threshold,
                threshold_index,
                replicate_id,
                oracle: oracle_index.map(|i| candidates[i].clone()),
                commit_step: outcome.commit_step,
                forced: outcome.forced,
                exploration_shots: outcome.exploration_shots,
                final_shots: outcome.final_shots,
                final_quality,
                oracle_quality,
                regret: final_quality - oracle_quality,
                selected: outcome.selected,
            })
        })
        .collect::<Result<Vec<_>, QsbError>>()?;

    let pooled_oracle = study_oracle(source, candidates, config.total_budget, replicates)?;
    let summaries: Vec<ThresholdSummary> = thresholds
        .iter()
        .enumerate()
        .map(|(index, threshold)| {
            let runs: Vec<&RegretRecord> = records.iter().filter(|r| r.threshold_index == index).collect();
            ThresholdSummary::from_records(*threshold, &runs, pooled_oracle.as_deref())
        })
        .collect();
    for summary in &summaries {
        info!(
            threshold = summary.threshold,
            runs = summary.n_runs,
            accuracy = summary.accuracy,
            pooled_accuracy = summary.pooled_accuracy,
            mean_regret = summary.mean_regret,
            mean_commit_step = summary.mean_commit_step,
            forced_commit_rate = summary.forced_commit_rate,
            "adaptive threshold summarised"
        );
    }
    Ok(RegretStudy {
        records,
        summaries,
        pooled_oracle,
    })
}
