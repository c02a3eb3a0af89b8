use qsb_core::QsbError;
use qsb_stats::{individual_confidence, validate_alpha, z_critical, FwerMethod};
use serde::{Deserialize, Serialize};

use crate::rows::BudgetRow;

/// Per-observable quality metric, chosen once per task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    /// `z_adj · SE` with the FWER-adjusted level over the replicate's observables.
    CiHalfWidth {
        /// Family-wise significance.
        alpha: f64,
        /// Correction method.
        #[serde(default)]
        fwer: FwerMethod,
    },
    /// `|estimate − truth|`; rows without truth are skipped.
    TruthError,
}

impl Default for Criterion {
    fn default() -> Self {
        Criterion::CiHalfWidth {
            alpha: 0.05,
            fwer: FwerMethod::Bonferroni,
        }
    }
}

impl Criterion {
    /// Stable label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::CiHalfWidth { .. } => "ci_half_width",
            Criterion::TruthError => "truth_error",
        }
    }

    /// Fails fast on an invalid significance level.
    pub fn validate(&self) -> Result<(), QsbError> {
        match self {
            Criterion::CiHalfWidth { alpha, .. } => validate_alpha(*alpha),
            Criterion::TruthError => Ok(()),
        }
    }

    /// Metrics for the observables of one replicate at one budget.
    pub fn replicate_metrics(&self, rows: &[&BudgetRow]) -> Result<Vec<f64>, QsbError> {
        match self {
            Criterion::CiHalfWidth { alpha, fwer } => {
                if rows.is_empty() {
                    return Ok(Vec::new());
                }
                let level = individual_confidence(*alpha, rows.len(), *fwer)?;
                let z = z_critical(level)?;
                Ok(rows.iter().map(|row| z * row.standard_error).collect())
            }
            Criterion::TruthError => Ok(rows
                .iter()
                .filter_map(|row| row.truth.map(|truth| (row.estimate - truth).abs()))
                .collect()),
        }
    }
}
