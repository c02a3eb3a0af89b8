use std::fmt;
use std::str::FromStr;

use qsb_core::{ErrorInfo, QsbError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ci::{normal_ci, ConfidenceInterval};
use crate::normal::standard_normal_cdf;

/// Family-wise error rate correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FwerMethod {
    /// `α / M`.
    #[default]
    Bonferroni,
    /// `1 − (1 − α)^{1/M}`.
    Sidak,
    /// Step-down over p-values; Bonferroni when only intervals are built.
    Holm,
}

impl FwerMethod {
    /// Stable label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            FwerMethod::Bonferroni => "bonferroni",
            FwerMethod::Sidak => "sidak",
            FwerMethod::Holm => "holm",
        }
    }
}

impl fmt::Display for FwerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FwerMethod {
    type Err = QsbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bonferroni" => Ok(FwerMethod::Bonferroni),
            "sidak" => Ok(FwerMethod::Sidak),
            "holm" => Ok(FwerMethod::Holm),
            other => Err(QsbError::Config(
                ErrorInfo::new("unknown-fwer-method", "unsupported family-wise correction")
                    .with_context("method", other)
                    .with_hint("use bonferroni, sidak or holm"),
            )),
        }
    }
}

/// Rejects significance levels outside `(0, 1)`.
pub fn validate_alpha(alpha: f64) -> Result<(), QsbError> {
    if alpha > 0.0 && alpha < 1.0 {
        return Ok(());
    }
    Err(QsbError::Stats(
        ErrorInfo::new("invalid-alpha", "significance level must lie in (0, 1)")
            .with_context("alpha", alpha.to_string()),
    ))
}

fn ensure_family(family_size: usize) -> Result<(), QsbError> {
    if family_size == 0 {
        return Err(QsbError::Stats(ErrorInfo::new(
            "empty-family",
            "family-wise correction needs at least one test",
        )));
    }
    Ok(())
}

/// Per-test significance for a family of `family_size` tests at global `alpha`.
pub fn individual_alpha(alpha: f64, family_size: usize, method: FwerMethod) -> Result<f64, QsbError> {
    validate_alpha(alpha)?;
    ensure_family(family_size)?;
    let m = family_size as f64;
    Ok(match method {
        FwerMethod::Bonferroni | FwerMethod::Holm => alpha / m,
        FwerMethod::Sidak => 1.0 - (1.0 - alpha).powf(1.0 / m),
    })
}

/// Per-test confidence level, `1 − individual_alpha`.
pub fn individual_confidence(
    alpha: f64,
    family_size: usize,
    method: FwerMethod,
) -> Result<f64, QsbError> {
    Ok(1.0 - individual_alpha(alpha, family_size, method)?)
}

/// Holm step-down rejections, returned in input order. `NaN` p-values are
/// never rejected.
pub fn holm_reject(p_values: &[f64], alpha: f64) -> Result<Vec<bool>, QsbError> {
    validate_alpha(alpha)?;
    ensure_family(p_values.len())?;
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|a, b| p_values[*a].total_cmp(&p_values[*b]));

    let mut rejected = vec![false; m];
    for (rank, index) in order.into_iter().enumerate() {
        let threshold = alpha / (m - rank) as f64;
        let p = p_values[index];
        if p.is_nan() || p > threshold {
            break;
        }
        rejected[index] = true;
    }
    Ok(rejected)
}

/// Two-sided z-test p-value of `estimate` against `null_value`.
pub fn z_test_p_value(estimate: f64, standard_error: f64, null_value: f64) -> f64 {
    if estimate.is_nan() || standard_error.is_nan() || standard_error.is_infinite() {
        return 1.0;
    }
    if standard_error <= 0.0 {
        return if estimate == null_value { 1.0 } else { 0.0 };
    }
    let z = ((estimate - null_value) / standard_error).abs();
    (2.0 * (1.0 - standard_normal_cdf(z))).clamp(0.0, 1.0)
}

/// Anything carrying a point estimate with a standard error.
pub trait PointEstimate {
    /// Point estimate.
    fn point(&self) -> f64;
    /// Standard error of the estimate.
    fn standard_error(&self) -> f64;
}

impl PointEstimate for (f64, f64) {
    fn point(&self) -> f64 {
        self.0
    }

    fn standard_error(&self) -> f64 {
        self.1
    }
}

/// Intervals that jointly cover their targets with probability `family_level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimultaneousCis {
    /// One interval per estimate, in input order.
    pub intervals: Vec<ConfidenceInterval>,
    /// Confidence level used for each interval.
    pub individual_level: f64,
    /// Family-wise guarantee `1 − α`.
    pub family_level: f64,
    /// Correction applied.
    pub method: FwerMethod,
}

impl SimultaneousCis {
    /// True when every interval contains its truth. Length mismatches are false.
    pub fn all_contain(&self, truths: &[f64]) -> bool {
        self.intervals.len() == truths.len()
            && self
                .intervals
                .iter()
                .zip(truths)
                .all(|(interval, truth)| interval.contains(*truth))
    }

    /// Largest raw half-width in the family.
    pub fn max_half_width(&self) -> f64 {
        self.intervals
            .iter()
            .map(ConfidenceInterval::half_width)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Builds one normal interval per estimate at the FWER-adjusted level.
pub fn construct_simultaneous_cis<E: PointEstimate>(
    estimates: &[E],
    alpha: f64,
    method: FwerMethod,
) -> Result<SimultaneousCis, QsbError> {
    let individual_level = individual_confidence(alpha, estimates.len(), method)?;
    let intervals = estimates
        .iter()
        .map(|estimate| normal_ci(estimate.point(), estimate.standard_error(), individual_level))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        family = estimates.len(),
        method = method.as_str(),
        individual_level,
        "constructed simultaneous intervals"
    );
    Ok(SimultaneousCis {
        intervals,
        individual_level,
        family_level: 1.0 - alpha,
        method,
    })
}
