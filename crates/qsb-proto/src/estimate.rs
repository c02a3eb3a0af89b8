use qsb_core::QsbError;
use qsb_stats::{mean, normal_ci, sample_std, CiSpec, ConfidenceInterval, PointEstimate};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Final per-observable output of a protocol run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableEstimate {
    /// Observable identifier.
    pub observable_id: String,
    /// Point estimate of `coefficient · ⟨P⟩`.
    pub estimate: f64,
    /// Standard error; `+inf` when fewer than two shots informed it.
    pub standard_error: f64,
    /// Optional per-observable interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,
    /// Shots read for this observable.
    pub n_shots_used: usize,
}

impl PointEstimate for ObservableEstimate {
    fn point(&self) -> f64 {
        self.estimate
    }

    fn standard_error(&self) -> f64 {
        self.standard_error
    }
}

/// Estimate, standard error and the per-shot contributions behind them.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// Point estimate.
    pub estimate: f64,
    /// Standard error.
    pub standard_error: f64,
    /// Per-shot values behind the estimate.
    pub contributions: Vec<f64>,
    /// Whether `estimate` is the plain mean of `contributions`. Bootstrap
    /// intervals resample that mean, so any other statistic gets the normal
    /// interval from `standard_error`.
    pub mean_of_contributions: bool,
}

impl Reduction {
    /// Mean and `sample_std / sqrt(n)` of the contributions. No shots give
    /// `NaN` with infinite error; one shot gives infinite error.
    pub fn from_contributions(contributions: Vec<f64>) -> Self {
        let n = contributions.len();
        let estimate = mean(&contributions);
        let standard_error = if n < 2 {
            f64::INFINITY
        } else {
            sample_std(&contributions) / (n as f64).sqrt()
        };
        Self {
            estimate,
            standard_error,
            contributions,
            mean_of_contributions: true,
        }
    }

    /// Known value with zero error (identity observables).
    pub fn exact(value: f64, n_shots: usize) -> Self {
        Self {
            estimate: value,
            standard_error: 0.0,
            contributions: vec![value; n_shots],
            mean_of_contributions: true,
        }
    }

    /// Packages the reduction, attaching an interval when requested.
    pub fn into_estimate<R: Rng + ?Sized>(
        self,
        observable_id: &str,
        n_shots_used: usize,
        ci: Option<&CiSpec>,
        rng: &mut R,
    ) -> Result<ObservableEstimate, QsbError> {
        let confidence_interval = match ci {
            Some(spec) if self.mean_of_contributions => Some(spec.interval(
                &self.contributions,
                self.estimate,
                self.standard_error,
                rng,
            )?),
            Some(spec) => Some(normal_ci(self.estimate, self.standard_error, spec.level)?),
            None => None,
        };
        Ok(ObservableEstimate {
            observable_id: observable_id.to_string(),
            estimate: self.estimate,
            standard_error: self.standard_error,
            confidence_interval,
            n_shots_used,
        })
    }
}
