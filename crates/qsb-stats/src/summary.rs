use serde::{Deserialize, Serialize};

/// Arithmetic mean, `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with `ddof = 1`, `NaN` below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let len = values.len();
    if len < 2 {
        return f64::NAN;
    }
    let centre = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - centre) * (v - centre)).sum();
    (sum_sq / (len - 1) as f64).sqrt()
}

/// Standard error of the mean, `+inf` below two values.
pub fn standard_error(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::INFINITY;
    }
    sample_std(values) / (values.len() as f64).sqrt()
}

/// Median by linear interpolation.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 0.5)
}

/// Percentile of unsorted data, `quantile` in `[0, 1]`.
pub fn percentile(values: &[f64], quantile: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, quantile)
}

/// Percentile of already sorted data using linear interpolation between ranks.
pub fn percentile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() || quantile.is_nan() {
        return f64::NAN;
    }
    let position = quantile.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        let weight = position - lower as f64;
        values[lower] * (1.0 - weight) + values[upper] * weight
    }
}

/// Quantile summary for a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    /// 5th percentile estimate.
    pub q05: f64,
    /// Median (50th percentile) estimate.
    pub q50: f64,
    /// 95th percentile estimate.
    pub q95: f64,
}

/// 5 / 50 / 95 percentiles of `values`.
pub fn quantiles(values: &[f64]) -> Quantiles {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Quantiles {
        q05: percentile_sorted(&sorted, 0.05),
        q50: percentile_sorted(&sorted, 0.5),
        q95: percentile_sorted(&sorted, 0.95),
    }
}

/// Distribution summary over the finite entries of a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Number of finite values summarised.
    pub count: usize,
    /// Number of `NaN` or infinite values skipped.
    pub non_finite: usize,
    /// Mean of the finite values.
    pub mean: f64,
    /// Sample standard deviation of the finite values.
    pub std: f64,
    /// Smallest finite value.
    pub min: f64,
    /// Largest finite value.
    pub max: f64,
    /// Percentile summary.
    pub quantiles: Quantiles,
}

impl DistributionSummary {
    /// Summarises `values`, skipping non-finite entries.
    pub fn from_values(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count: finite.len(),
            non_finite: values.len() - finite.len(),
            mean: mean(&finite),
            std: sample_std(&finite),
            min: if finite.is_empty() { f64::NAN } else { min },
            max: if finite.is_empty() { f64::NAN } else { max },
            quantiles: quantiles(&finite),
        }
    }
}
