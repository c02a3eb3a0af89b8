use std::collections::BTreeMap;

use qsb_core::{ErrorInfo, QsbError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::nstar::{shot_savings_factor, NStarResult, NStarTask};
use crate::rows::{protocol_ids, BudgetRow};

/// N* and shot-savings factor for one protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolTaskResult {
    /// Search outcome.
    pub n_star: NStarResult,
    /// `N*_baseline / N*_protocol`.
    pub shot_savings_factor: Option<f64>,
}

/// Task outcome for every protocol present in the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvaluation {
    /// Task that was evaluated.
    pub task: NStarTask,
    /// Baseline protocol id.
    pub baseline_id: String,
    /// Results keyed by protocol id.
    pub protocols: BTreeMap<String, ProtocolTaskResult>,
}

/// Evaluates `task` for every protocol and compares each against `baseline_id`.
pub fn evaluate_protocols(
    rows: &[BudgetRow],
    task: &NStarTask,
    baseline_id: &str,
) -> Result<TaskEvaluation, QsbError> {
    task.validate()?;
    let ids = protocol_ids(rows);
    if !ids.iter().any(|id| id == baseline_id) {
        return Err(QsbError::Config(
            ErrorInfo::new("missing-baseline", "baseline protocol has no rows")
                .with_context("baseline", baseline_id)
                .with_context("protocols", ids.join(","))
                .with_hint("include the baseline in the protocol list"),
        ));
    }

    let baseline = task.evaluate(rows, baseline_id)?;
    let mut protocols = BTreeMap::new();
    for id in &ids {
        let result = if id == baseline_id {
            baseline.clone()
        } else {
            task.evaluate(rows, id)?
        };
        let ssf = shot_savings_factor(baseline.n_star, result.n_star);
        info!(protocol = %id, n_star = ?result.n_star, ssf = ?ssf, "task evaluated");
        protocols.insert(
            id.clone(),
            ProtocolTaskResult {
                n_star: result,
                shot_savings_factor: ssf,
            },
        );
    }
    Ok(TaskEvaluation {
        task: *task,
        baseline_id: baseline_id.to_string(),
        protocols,
    })
}
