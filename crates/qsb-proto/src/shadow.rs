//! Classical-shadow estimator for random local Pauli measurements.
//!
//! Basis indices follow `0 = Z`, `1 = X`, `2 = Y`. Incompatible shots
//! contribute an explicit zero so the estimator stays unbiased over the
//! whole sample.

use qsb_obs::Observable;
use qsb_stats::{median, sample_std};

use crate::estimate::Reduction;

/// `(qubit, basis index)` pairs the observable needs on its support.
pub fn required_basis(observable: &Observable) -> Vec<(usize, u8)> {
    observable
        .pauli
        .symbols()
        .iter()
        .enumerate()
        .filter(|(_, symbol)| !symbol.is_identity())
        .map(|(qubit, symbol)| (qubit, symbol.basis_index()))
        .collect()
}

/// Contribution of one shot: `3^k · c · Π(1 − 2·outcome_i)` when the shot's
/// bases match on the support, otherwise zero.
pub fn shadow_contribution(
    outcomes: &[u8],
    basis_choices: &[u8],
    required: &[(usize, u8)],
    coefficient: f64,
) -> f64 {
    let mut product = 1.0;
    for &(qubit, basis) in required {
        if basis_choices.get(qubit) != Some(&basis) {
            return 0.0;
        }
        if outcomes.get(qubit) == Some(&1) {
            product = -product;
        }
    }
    3f64.powi(required.len() as i32) * coefficient * product
}

/// Per-shot contributions for `observable`.
pub fn shadow_contributions(
    outcomes: &[&[u8]],
    basis_choices: &[&[u8]],
    observable: &Observable,
) -> Vec<f64> {
    let required = required_basis(observable);
    outcomes
        .iter()
        .zip(basis_choices)
        .map(|(bits, bases)| shadow_contribution(bits, bases, &required, observable.coefficient))
        .collect()
}

/// Mean of contributions with `sample_std / sqrt(n)` error.
pub fn estimate_shadow(
    outcomes: &[&[u8]],
    basis_choices: &[&[u8]],
    observable: &Observable,
) -> Reduction {
    if observable.locality() == 0 {
        return Reduction::exact(observable.coefficient, outcomes.len());
    }
    Reduction::from_contributions(shadow_contributions(outcomes, basis_choices, observable))
}

/// Worst-case variance bound `4^weight / shadow_size` used for planning.
pub fn shadow_variance_bound(weight: usize, shadow_size: usize) -> f64 {
    if shadow_size == 0 {
        return f64::INFINITY;
    }
    4f64.powi(weight as i32) / shadow_size as f64
}

/// Median of `groups` contiguous block means of `floor(n / groups)` shots.
///
/// The trailing remainder is dropped. The error is the group dispersion
/// `sqrt(pi/2) · sample_std(means) / sqrt(groups)`, and intervals are normal
/// around the median. `groups` is clamped to the number of contributions; one
/// group or fewer is the plain mean.
pub fn median_of_means(contributions: Vec<f64>, groups: usize) -> Reduction {
    let groups = groups.min(contributions.len());
    if groups <= 1 {
        return Reduction::from_contributions(contributions);
    }
    let size = contributions.len() / groups;
    let means: Vec<f64> = contributions
        .chunks_exact(size)
        .take(groups)
        .map(|block| block.iter().sum::<f64>() / size as f64)
        .collect();
    let standard_error =
        (std::f64::consts::PI / 2.0).sqrt() * sample_std(&means) / (groups as f64).sqrt();
    Reduction {
        estimate: median(&means),
        standard_error,
        contributions,
        mean_of_contributions: false,
    }
}

#[cfg(test)]
mod tests {
    use qsb_core::RngHandle;
    use qsb_stats::{CiMethod, CiSpec};

    use super::*;

    #[test]
    fn incompatible_shots_count_as_zero() {
        let observable = Observable::parse("xz", "XZ", 1.0).unwrap();
        let required = required_basis(&observable);
        assert_eq!(required, vec![(0, 1), (1, 0)]);
        assert_eq!(shadow_contribution(&[0, 1], &[1, 0], &required, 1.0), -9.0);
        assert_eq!(shadow_contribution(&[0, 1], &[2, 0], &required, 1.0), 0.0);
    }

    #[test]
    fn variance_bound() {
        assert_eq!(shadow_variance_bound(2, 16), 1.0);
        assert!(shadow_variance_bound(1, 0).is_infinite());
    }

    #[test]
    fn median_of_means_drops_remainder() {
        let values = vec![1.0, 1.0, 3.0, 3.0, 10.0, 10.0, 100.0];
        let reduction = median_of_means(values, 3);
        assert_eq!(reduction.estimate, 3.0);
        assert!(reduction.standard_error.is_finite());
        let plain = median_of_means(vec![1.0, 3.0], 1);
        assert_eq!(plain.estimate, 2.0);
        assert!(plain.mean_of_contributions);
    }

    #[test]
    fn median_of_means_interval_brackets_the_median() {
        let mut values = vec![0.0; 90];
        values.extend(std::iter::repeat(9.0).take(10));
        let reduction = median_of_means(values, 10);
        assert_eq!(reduction.estimate, 0.0);
        assert!(!reduction.mean_of_contributions);

        let spec = CiSpec {
            method: CiMethod::BootstrapPercentile,
            ..CiSpec::default()
        };
        let mut rng = RngHandle::from_seed(3);
        let estimate = reduction
            .into_estimate("spiky", 100, Some(&spec), &mut rng)
            .unwrap();
        let ci = estimate.confidence_interval.unwrap();
        assert_eq!(ci.method, CiMethod::Normal);
        assert!(ci.low_raw <= 0.0 && ci.high_raw >= 0.0);
        assert!(ci.contains(estimate.estimate));
    }
}
