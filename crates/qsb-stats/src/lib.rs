#![deny(missing_docs)]
#![doc = "Summary statistics, confidence intervals and family-wise error control."]

/// Normal and bootstrap confidence intervals.
pub mod ci;
/// Family-wise error rate corrections and simultaneous intervals.
pub mod fwer;
/// Standard normal helpers.
pub mod normal;
/// Descriptive statistics.
pub mod summary;

pub use ci::{
    bootstrap_bca_ci, bootstrap_percentile_ci, normal_ci, validate_level, z_critical, CiMethod,
    CiSpec, ConfidenceInterval,
};
pub use fwer::{
    construct_simultaneous_cis, holm_reject, individual_alpha, individual_confidence,
    validate_alpha, z_test_p_value, FwerMethod, PointEstimate, SimultaneousCis,
};
pub use normal::{standard_normal_cdf, standard_normal_quantile};
pub use summary::{
    mean, median, percentile, percentile_sorted, quantiles, sample_std, standard_error,
    DistributionSummary, Quantiles,
};
