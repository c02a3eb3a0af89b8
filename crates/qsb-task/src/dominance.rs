use std::collections::BTreeMap;

use qsb_core::QsbError;
use qsb_stats::{mean, median};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::criterion::Criterion;
use crate::rows::{index_rows, BudgetIndex, BudgetRow};

/// Per-budget comparison of a candidate against a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominanceResult {
    /// Candidate protocol id.
    pub candidate_id: String,
    /// Baseline protocol id.
    pub baseline_id: String,
    /// `n_total → (candidate median metric, baseline median metric)` over shared budgets.
    pub medians: BTreeMap<usize, (f64, f64)>,
    /// Fraction of shared budgets at which the candidate dominates; `NaN` with none shared.
    pub fraction_dominated: f64,
    /// Smallest budget from which the candidate dominates at every larger shared budget.
    pub dominates_from: Option<usize>,
}

/// Median over replicates of the mean observable metric, per budget.
fn median_metric_by_budget(
    index: &BudgetIndex<'_>,
    criterion: &Criterion,
) -> Result<BTreeMap<usize, f64>, QsbError> {
    let mut out = BTreeMap::new();
    for (n_total, replicates) in index {
        let mut per_replicate = Vec::with_capacity(replicates.len());
        for replicate_rows in replicates.values() {
            let metrics = criterion.replicate_metrics(replicate_rows)?;
            if !metrics.is_empty() {
                per_replicate.push(mean(&metrics));
            }
        }
        out.insert(*n_total, median(&per_replicate));
    }
    Ok(out)
}

/// Compares `candidate_id` to `baseline_id` at every budget both ran.
///
/// The candidate dominates at a budget when its median metric is no larger
/// than the baseline's. A `NaN` median on either side never dominates.
pub fn dominance(
    rows: &[BudgetRow],
    candidate_id: &str,
    baseline_id: &str,
    criterion: &Criterion,
) -> Result<DominanceResult, QsbError> {
    criterion.validate()?;
    let candidate = median_metric_by_budget(&index_rows(rows, candidate_id), criterion)?;
    let baseline = median_metric_by_budget(&index_rows(rows, baseline_id), criterion)?;

    let medians: BTreeMap<usize, (f64, f64)> = candidate
        .iter()
        .filter_map(|(n, c)| baseline.get(n).map(|b| (*n, (*c, *b))))
        .collect();

    let flags: Vec<(usize, bool)> = medians.iter().map(|(n, (c, b))| (*n, c <= b)).collect();
    let fraction_dominated = if flags.is_empty() {
        f64::NAN
    } else {
        flags.iter().filter(|(_, wins)| *wins).count() as f64 / flags.len() as f64
    };

    let mut dominates_from = None;
    for (n, wins) in flags.iter().rev() {
        if !wins {
            break;
        }
        dominates_from = Some(*n);
    }

    debug!(
        candidate = candidate_id,
        baseline = baseline_id,
        shared_budgets = medians.len(),
        fraction_dominated,
        ?dominates_from,
        "dominance computed"
    );
    Ok(DominanceResult {
        candidate_id: candidate_id.to_string(),
        baseline_id: baseline_id.to_string(),
        medians,
        fraction_dominated,
        dominates_from,
    })
}
