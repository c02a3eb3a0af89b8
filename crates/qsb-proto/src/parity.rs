//! Direct-family estimator: each observable reads the parity of its own
//! support columns from the shared outcome stream of its setting.

use qsb_obs::Observable;

use crate::estimate::Reduction;

/// `(-1)^(number of 1s on support)`. Positions beyond the bitstring count as 0.
pub fn parity_eigenvalue(bitstring: &str, support: &[usize]) -> f64 {
    let bytes = bitstring.as_bytes();
    let ones = support
        .iter()
        .filter(|qubit| bytes.get(**qubit) == Some(&b'1'))
        .count();
    if ones % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Reduces the bitstrings of one setting to an estimate for `observable`.
///
/// Identity observables estimate exactly their coefficient with zero error.
pub fn estimate_direct(observable: &Observable, bitstrings: &[&str]) -> Reduction {
    let support = observable.support();
    if support.is_empty() {
        return Reduction::exact(observable.coefficient, bitstrings.len());
    }
    let contributions = bitstrings
        .iter()
        .map(|bits| observable.coefficient * parity_eigenvalue(bits, &support))
        .collect();
    Reduction::from_contributions(contributions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_reads_only_support() {
        assert_eq!(parity_eigenvalue("0110", &[1, 2]), 1.0);
        assert_eq!(parity_eigenvalue("0110", &[0, 1]), -1.0);
        assert_eq!(parity_eigenvalue("0110", &[0, 3]), 1.0);
    }

    #[test]
    fn scaled_mean_and_standard_error() {
        let observable = Observable::parse("zz", "ZZI", -0.5).unwrap();
        let shots = ["000", "110", "100", "011"];
        let reduction = estimate_direct(&observable, &shots);
        // Eigenvalues +1, +1, -1, -1.
        assert!(reduction.estimate.abs() < 1e-12);
        let expected_se = 0.5 * (4.0f64 / 3.0).sqrt() / 2.0;
        assert!((reduction.standard_error - expected_se).abs() < 1e-12);
    }

    #[test]
    fn sparsity_sentinels() {
        let observable = Observable::parse("z", "ZI", 1.0).unwrap();
        let empty = estimate_direct(&observable, &[]);
        assert!(empty.estimate.is_nan());
        assert!(empty.standard_error.is_infinite());

        let single = estimate_direct(&observable, &["10"]);
        assert_eq!(single.estimate, -1.0);
        assert!(single.standard_error.is_infinite());

        let identity = Observable::parse("id", "II", 0.75).unwrap();
        let exact = estimate_direct(&identity, &[]);
        assert_eq!((exact.estimate, exact.standard_error), (0.75, 0.0));
    }
}
