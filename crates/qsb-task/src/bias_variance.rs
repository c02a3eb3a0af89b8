//! Bias-variance decomposition over replicates and the `RMSE ≈ A·N^b` fit.

use std::collections::BTreeMap;

use qsb_stats::{mean, sample_std};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rows::{index_rows, BudgetRow};

/// Exponent used when the log-log fit is unusable.
pub const FALLBACK_EXPONENT: f64 = -0.5;

/// Decomposition of one observable at one budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableBiasVariance {
    /// Observable id.
    pub observable_id: String,
    /// `mean(estimate) − truth`.
    pub bias: f64,
    /// Replicate variance with `ddof = 1`; `NaN` below two replicates.
    pub variance: f64,
    /// `bias² + variance`.
    pub mse: f64,
    /// Replicates carrying a truth.
    pub n_replicates: usize,
}

/// Observable-averaged decomposition at one budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBiasVariance {
    /// Total shot budget.
    pub n_total: usize,
    /// Mean bias over observables.
    pub mean_bias: f64,
    /// Mean variance over observables.
    pub mean_variance: f64,
    /// Mean MSE over observables.
    pub mean_mse: f64,
    /// `sqrt(mean_mse)`.
    pub rmse: f64,
    /// Per-observable rows, in observable-id order.
    pub observables: Vec<ObservableBiasVariance>,
}

/// Per-budget decomposition for one protocol. Rows without truth are ignored.
pub fn bias_variance(rows: &[BudgetRow], protocol_id: &str) -> Vec<BudgetBiasVariance> {
    let index = index_rows(rows, protocol_id);
    let mut out = Vec::with_capacity(index.len());
    for (n_total, replicates) in &index {
        let mut by_observable: BTreeMap<&str, (f64, Vec<f64>)> = BTreeMap::new();
        for row in replicates.values().flatten() {
            let Some(truth) = row.truth else {
                continue;
            };
            by_observable
                .entry(row.observable_id.as_str())
                .or_insert_with(|| (truth, Vec::new()))
                .1
                .push(row.estimate);
        }
        let observables: Vec<ObservableBiasVariance> = by_observable
            .into_iter()
            .map(|(id, (truth, estimates))| {
                let bias = mean(&estimates) - truth;
                let std = sample_std(&estimates);
                let variance = std * std;
                ObservableBiasVariance {
                    observable_id: id.to_string(),
                    bias,
                    variance,
                    mse: bias * bias + variance,
                    n_replicates: estimates.len(),
                }
            })
            .collect();
        let mean_of = |f: fn(&ObservableBiasVariance) -> f64| {
            mean(&observables.iter().map(f).collect::<Vec<_>>())
        };
        let mean_bias = mean_of(|o| o.bias);
        let mean_variance = mean_of(|o| o.variance);
        let mean_mse = mean_of(|o| o.mse);
        out.push(BudgetBiasVariance {
            n_total: *n_total,
            mean_bias,
            mean_variance,
            mean_mse,
            rmse: mean_mse.sqrt(),
            observables,
        });
    }
    out
}

/// Fitted `RMSE ≈ amplitude · N^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawFit {
    /// `A`.
    pub amplitude: f64,
    /// `b`, negative for a converging estimator.
    pub exponent: f64,
    /// Whether the closed-form fallback replaced the regression.
    pub fallback: bool,
}

impl PowerLawFit {
    /// Fits `(N, RMSE)` points by least squares in log-log space.
    ///
    /// Points with non-positive or non-finite coordinates are skipped. With
    /// fewer than two usable points, or a non-finite or non-negative slope, the
    /// fit falls back to `b = −0.5` and `A = mean(RMSE · sqrt(N))`.
    pub fn fit(points: &[(usize, f64)]) -> Self {
        let usable: Vec<(f64, f64)> = points
            .iter()
            .filter(|(n, rmse)| *n > 0 && rmse.is_finite() && *rmse > 0.0)
            .map(|(n, rmse)| ((*n as f64).ln(), rmse.ln()))
            .collect();

        if usable.len() >= 2 {
            let x_mean = usable.iter().map(|(x, _)| x).sum::<f64>() / usable.len() as f64;
            let y_mean = usable.iter().map(|(_, y)| y).sum::<f64>() / usable.len() as f64;
            let sxx: f64 = usable.iter().map(|(x, _)| (x - x_mean).powi(2)).sum();
            let sxy: f64 = usable.iter().map(|(x, y)| (x - x_mean) * (y - y_mean)).sum();
            let slope = sxy / sxx;
            if slope.is_finite() && slope < 0.0 {
                let fit = Self {
                    amplitude: (y_mean - slope * x_mean).exp(),
                    exponent: slope,
                    fallback: false,
                };
                debug!(amplitude = fit.amplitude, exponent = fit.exponent, "power-law fit");
                return fit;
            }
        }

        let scaled: Vec<f64> = points
            .iter()
            .filter(|(_, rmse)| rmse.is_finite())
            .map(|(n, rmse)| rmse * (*n as f64).sqrt())
            .collect();
        let fit = Self {
            amplitude: mean(&scaled),
            exponent: FALLBACK_EXPONENT,
            fallback: true,
        };
        warn!(
            usable_points = usable.len(),
            amplitude = fit.amplitude,
            "power-law fit unusable, falling back to N^-1/2"
        );
        fit
    }

    /// Fits the per-budget RMSE of a decomposition.
    pub fn from_budgets(budgets: &[BudgetBiasVariance]) -> Self {
        let points: Vec<(usize, f64)> = budgets.iter().map(|b| (b.n_total, b.rmse)).collect();
        Self::fit(&points)
    }

    /// Predicted RMSE at `n_total`.
    pub fn predict(&self, n_total: usize) -> f64 {
        self.amplitude * (n_total as f64).powf(self.exponent)
    }

    /// Smallest budget whose predicted RMSE reaches `epsilon`: `ceil((ε/A)^{1/b})`.
    ///
    /// `None` when ε or the fit parameters are unusable.
    pub fn fit_n_star(&self, epsilon: f64) -> Option<usize> {
        if !(epsilon > 0.0 && self.amplitude.is_finite() && self.amplitude > 0.0)
            || !(self.exponent < 0.0)
        {
            return None;
        }
        let n = (epsilon / self.amplitude).powf(1.0 / self.exponent).ceil();
        (n.is_finite() && n >= 0.0 && n <= usize::MAX as f64).then_some(n as usize)
    }
}
