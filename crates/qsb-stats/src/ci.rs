use std::fmt;
use std::str::FromStr;

use qsb_core::{ErrorInfo, QsbError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normal::{standard_normal_cdf, standard_normal_quantile};
use crate::summary::{mean, percentile_sorted, standard_error};

/// Physical range of a Pauli expectation value used for reported bounds.
pub const PHYSICAL_LOW: f64 = -1.0;
/// Upper physical bound.
pub const PHYSICAL_HIGH: f64 = 1.0;

/// Interval construction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CiMethod {
    /// `estimate ± z · SE`.
    #[default]
    Normal,
    /// Empirical percentiles of bootstrap means.
    BootstrapPercentile,
    /// Bias-corrected and accelerated bootstrap.
    BootstrapBca,
}

impl CiMethod {
    /// Stable label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CiMethod::Normal => "normal",
            CiMethod::BootstrapPercentile => "bootstrap_percentile",
            CiMethod::BootstrapBca => "bootstrap_bca",
        }
    }
}

impl fmt::Display for CiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CiMethod {
    type Err = QsbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(CiMethod::Normal),
            "bootstrap_percentile" | "percentile" => Ok(CiMethod::BootstrapPercentile),
            "bootstrap_bca" | "bca" => Ok(CiMethod::BootstrapBca),
            other => Err(QsbError::Config(
                ErrorInfo::new("unknown-ci-method", "unsupported confidence interval method")
                    .with_context("method", other)
                    .with_hint("use normal, bootstrap_percentile or bootstrap_bca"),
            )),
        }
    }
}

/// Interval with raw bounds and bounds clamped to the physical range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound before clamping.
    pub low_raw: f64,
    /// Upper bound before clamping.
    pub high_raw: f64,
    /// Reported lower bound.
    pub low_clamped: f64,
    /// Reported upper bound.
    pub high_clamped: f64,
    /// Nominal coverage.
    pub level: f64,
    /// Construction method.
    pub method: CiMethod,
}

impl ConfidenceInterval {
    /// Builds an interval from raw bounds, clamping the reported pair to `[-1, 1]`.
    pub fn from_raw(low_raw: f64, high_raw: f64, level: f64, method: CiMethod) -> Self {
        let clamp = |value: f64| {
            if value.is_nan() {
                value
            } else {
                value.clamp(PHYSICAL_LOW, PHYSICAL_HIGH)
            }
        };
        Self {
            low_raw,
            high_raw,
            low_clamped: clamp(low_raw),
            high_clamped: clamp(high_raw),
            level,
            method,
        }
    }

    /// Half of the raw width.
    pub fn half_width(&self) -> f64 {
        (self.high_raw - self.low_raw) / 2.0
    }

    /// Raw width.
    pub fn width(&self) -> f64 {
        self.high_raw - self.low_raw
    }

    /// True when `value` lies inside the reported bounds.
    pub fn contains(&self, value: f64) -> bool {
        self.low_clamped <= value && value <= self.high_clamped
    }
}

/// Rejects confidence levels outside `(0, 1)`.
pub fn validate_level(level: f64) -> Result<(), QsbError> {
    if level > 0.0 && level < 1.0 {
        return Ok(());
    }
    Err(QsbError::Stats(
        ErrorInfo::new("invalid-confidence-level", "confidence level must lie in (0, 1)")
            .with_context("level", level.to_string()),
    ))
}

/// Two-sided critical value `z_{(1 + level) / 2}`.
pub fn z_critical(level: f64) -> Result<f64, QsbError> {
    validate_level(level)?;
    Ok(standard_normal_quantile((1.0 + level) / 2.0))
}

/// Normal-approximation interval. A non-finite standard error yields
/// unbounded raw bounds and the full physical range as reported bounds.
pub fn normal_ci(estimate: f64, standard_error: f64, level: f64) -> Result<ConfidenceInterval, QsbError> {
    let z = z_critical(level)?;
    if !standard_error.is_finite() {
        return Ok(ConfidenceInterval::from_raw(
            f64::NEG_INFINITY,
            f64::INFINITY,
            level,
            CiMethod::Normal,
        ));
    }
    let half = z * standard_error;
    Ok(ConfidenceInterval::from_raw(
        estimate - half,
        estimate + half,
        level,
        CiMethod::Normal,
    ))
}

fn validate_resamples(n_resamples: usize) -> Result<(), QsbError> {
    if n_resamples == 0 {
        return Err(QsbError::Stats(ErrorInfo::new(
            "invalid-resample-count",
            "bootstrap needs at least one resample",
        )));
    }
    Ok(())
}

/// Sorted bootstrap distribution of the sample mean.
fn bootstrap_means<R: Rng + ?Sized>(samples: &[f64], n_resamples: usize, rng: &mut R) -> Vec<f64> {
    let len = samples.len();
    let mut stats = Vec::with_capacity(n_resamples);
    for _ in 0..n_resamples {
        let mut total = 0.0;
        for _ in 0..len {
            total += samples[rng.gen_range(0..len)];
        }
        stats.push(total / len as f64);
    }
    stats.sort_by(f64::total_cmp);
    stats
}

/// Percentile bootstrap interval of the mean. Fewer than two samples fall back
/// to the normal interval.
pub fn bootstrap_percentile_ci<R: Rng + ?Sized>(
    samples: &[f64],
    level: f64,
    n_resamples: usize,
    rng: &mut R,
) -> Result<ConfidenceInterval, QsbError> {
    validate_level(level)?;
    validate_resamples(n_resamples)?;
    if samples.len() < 2 {
        return normal_ci(mean(samples), standard_error(samples), level);
    }
    let stats = bootstrap_means(samples, n_resamples, rng);
    Ok(percentile_interval(&stats, level))
}

fn percentile_interval(sorted_stats: &[f64], level: f64) -> ConfidenceInterval {
    let tail = (1.0 - level) / 2.0;
    ConfidenceInterval::from_raw(
        percentile_sorted(sorted_stats, tail),
        percentile_sorted(sorted_stats, 1.0 - tail),
        level,
        CiMethod::BootstrapPercentile,
    )
}

/// BCa bootstrap interval of the mean.
///
/// Degenerate bootstrap distributions (all resamples equal, or no resample on
/// one side of the original statistic) fall back to the percentile interval;
/// fewer than two samples fall back to the normal interval.
pub fn bootstrap_bca_ci<R: Rng + ?Sized>(
    samples: &[f64],
    level: f64,
    n_resamples: usize,
    rng: &mut R,
) -> Result<ConfidenceInterval, QsbError> {
    validate_level(level)?;
    validate_resamples(n_resamples)?;
    if samples.len() < 2 {
        return normal_ci(mean(samples), standard_error(samples), level);
    }
    let original = mean(samples);
    let stats = bootstrap_means(samples, n_resamples, rng);

    let below = stats.iter().filter(|value| **value < original).count();
    let fraction = below as f64 / stats.len() as f64;
    let all_equal = stats.first() == stats.last();
    if all_equal || fraction <= 0.0 || fraction >= 1.0 {
        debug!(fraction, all_equal, "bca degenerate, using percentile interval");
        return Ok(percentile_interval(&stats, level));
    }
    let z0 = standard_normal_quantile(fraction);

    let len = samples.len() as f64;
    let total: f64 = samples.iter().sum();
    let jackknife: Vec<f64> = samples
        .iter()
        .map(|value| (total - value) / (len - 1.0))
        .collect();
    let jack_mean = mean(&jackknife);
    let (sum_sq, sum_cube) = jackknife.iter().fold((0.0, 0.0), |(sq, cube), value| {
        let d = jack_mean - value;
        (sq + d * d, cube + d * d * d)
    });
    let acceleration = if sum_sq > 0.0 {
        sum_cube / (6.0 * sum_sq.powf(1.5))
    } else {
        0.0
    };

    let tail = (1.0 - level) / 2.0;
    let adjust = |z_alpha: f64| {
        let shifted = z0 + z_alpha;
        standard_normal_cdf(z0 + shifted / (1.0 - acceleration * shifted))
    };
    let low_q = adjust(standard_normal_quantile(tail));
    let high_q = adjust(standard_normal_quantile(1.0 - tail));
    if !low_q.is_finite() || !high_q.is_finite() {
        return Ok(percentile_interval(&stats, level));
    }
    Ok(ConfidenceInterval::from_raw(
        percentile_sorted(&stats, low_q),
        percentile_sorted(&stats, high_q),
        level,
        CiMethod::BootstrapBca,
    ))
}

fn default_level() -> f64 {
    0.95
}

fn default_resamples() -> usize {
    1000
}

/// Per-observable interval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiSpec {
    /// Construction method.
    #[serde(default)]
    pub method: CiMethod,
    /// Nominal coverage.
    #[serde(default = "default_level")]
    pub level: f64,
    /// Bootstrap resample count.
    #[serde(default = "default_resamples")]
    pub n_resamples: usize,
}

impl Default for CiSpec {
    fn default() -> Self {
        Self {
            method: CiMethod::default(),
            level: default_level(),
            n_resamples: default_resamples(),
        }
    }
}

impl CiSpec {
    /// Fails fast on an invalid level or resample count.
    pub fn validate(&self) -> Result<(), QsbError> {
        validate_level(self.level)?;
        if self.method != CiMethod::Normal {
            validate_resamples(self.n_resamples)?;
        }
        Ok(())
    }

    /// Builds the requested interval. `samples` are the per-shot contributions
    /// whose mean is `estimate`; the normal method only uses `estimate` and
    /// `standard_error`.
    pub fn interval<R: Rng + ?Sized>(
        &self,
        samples: &[f64],
        estimate: f64,
        standard_error: f64,
        rng: &mut R,
    ) -> Result<ConfidenceInterval, QsbError> {
        match self.method {
            CiMethod::Normal => normal_ci(estimate, standard_error, self.level),
            CiMethod::BootstrapPercentile => {
                bootstrap_percentile_ci(samples, self.level, self.n_resamples, rng)
            }
            CiMethod::BootstrapBca => bootstrap_bca_ci(samples, self.level, self.n_resamples, rng),
        }
    }
}
