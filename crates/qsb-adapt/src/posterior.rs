//! Student-t posterior over a protocol's mean absolute error.

use qsb_core::{ErrorInfo, QsbError};
use qsb_stats::{mean, sample_std};
use rand::Rng;
use rand_distr::{Distribution, StudentT};
use serde::{Deserialize, Serialize};

/// Location used when a protocol has no error data yet.
pub const EMPTY_LOCATION: f64 = 1.0;

/// Location-scale Student-t belief about one protocol's error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorPosterior {
    /// Centre of the belief.
    pub location: f64,
    /// Scale multiplying the standard Student-t draw.
    pub scale: f64,
    /// Degrees of freedom.
    pub df: f64,
}

impl ErrorPosterior {
    /// Belief from `m` observed errors: `df = m − 1`, location `mean`,
    /// scale `sample_std / sqrt(m)`. Below two errors the belief is wide:
    /// `df = 1`, scale 1, centred at the single error or [`EMPTY_LOCATION`].
    pub fn from_errors(errors: &[f64]) -> Self {
        match errors {
            [] => Self::wide(EMPTY_LOCATION),
            [single] => Self::wide(*single),
            _ => {
                let m = errors.len() as f64;
                Self {
                    location: mean(errors),
                    scale: sample_std(errors) / m.sqrt(),
                    df: m - 1.0,
                }
            }
        }
    }

    fn wide(location: f64) -> Self {
        Self {
            location,
            scale: 1.0,
            df: 1.0,
        }
    }

    /// Prepares a reusable sampler.
    pub fn sampler(&self) -> Result<PosteriorSampler, QsbError> {
        let student = StudentT::new(self.df).map_err(|err| {
            QsbError::Stats(
                ErrorInfo::new("invalid-posterior", err.to_string())
                    .with_context("df", self.df.to_string()),
            )
        })?;
        Ok(PosteriorSampler {
            posterior: *self,
            student,
        })
    }
}

/// Draws from an [`ErrorPosterior`].
#[derive(Debug, Clone)]
pub struct PosteriorSampler {
    posterior: ErrorPosterior,
    student: StudentT<f64>,
}

impl PosteriorSampler {
    /// One draw `location + scale · t`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.posterior.location + self.posterior.scale * self.student.sample(rng)
    }
}

/// Index of the smallest value; ties and `NaN` keep the earlier index.
///
/// The tie rule favours protocols listed first. Selection studies inherit it.
pub fn argmin_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in values.iter().copied().enumerate() {
        match best {
            None => best = Some((index, value)),
            Some((_, current)) if value < current || (current.is_nan() && !value.is_nan()) => {
                best = Some((index, value))
            }
            _ => {}
        }
    }
    best.map(|(index, _)| index)
}

/// Monte-Carlo probability that each protocol has the lowest error.
pub fn probability_best<R: Rng + ?Sized>(
    posteriors: &[ErrorPosterior],
    n_mc: usize,
    rng: &mut R,
) -> Result<Vec<f64>, QsbError> {
    if n_mc == 0 {
        return Err(QsbError::config("invalid-mc-draws", "n_mc must be at least 1"));
    }
    let samplers = posteriors
        .iter()
        .map(ErrorPosterior::sampler)
        .collect::<Result<Vec<_>, _>>()?;
    let mut wins = vec![0usize; posteriors.len()];
    let mut draws = vec![0.0; posteriors.len()];
    for _ in 0..n_mc {
        for (slot, sampler) in draws.iter_mut().zip(&samplers) {
            *slot = sampler.draw(rng);
        }
        if let Some(best) = argmin_first(&draws) {
            wins[best] += 1;
        }
    }
    Ok(wins.into_iter().map(|w| w as f64 / n_mc as f64).collect())
}
