use approx::assert_relative_eq;
use qsb_core::RngHandle;
use qsb_stats::{
    bootstrap_bca_ci, bootstrap_percentile_ci, mean, normal_ci, standard_error, CiMethod, CiSpec,
};
use proptest::prelude::*;

fn spread_sample() -> Vec<f64> {
    (0..240)
        .map(|i| ((i * 37) % 101) as f64 / 101.0 - 0.45)
        .collect()
}

#[test]
fn normal_interval_matches_closed_form() {
    let ci = normal_ci(0.2, 0.05, 0.95).expect("normal ci");
    assert_relative_eq!(ci.half_width(), 1.959_963_984_540_054 * 0.05, epsilon = 1e-9);
    assert_relative_eq!(ci.low_raw, 0.2 - ci.half_width(), epsilon = 1e-12);
    assert_eq!(ci.method, CiMethod::Normal);
    assert!(ci.contains(0.25));
    assert!(!ci.contains(0.4));
}

#[test]
fn clamping_only_touches_reported_bounds() {
    let ci = normal_ci(0.95, 0.1, 0.95).expect("normal ci");
    assert!(ci.high_raw > 1.0);
    assert_eq!(ci.high_clamped, 1.0);
    // Half-width is computed from the raw pair.
    assert_relative_eq!(ci.half_width(), 1.959_963_984_540_054 * 0.1, epsilon = 1e-9);
    assert!(ci.contains(1.0));
}

#[test]
fn infinite_standard_error_reports_full_range() {
    let ci = normal_ci(0.3, f64::INFINITY, 0.9).expect("normal ci");
    assert!(ci.low_raw.is_infinite() && ci.high_raw.is_infinite());
    assert_eq!((ci.low_clamped, ci.high_clamped), (-1.0, 1.0));
}

#[test]
fn invalid_levels_fail_fast() {
    let err = normal_ci(0.0, 0.1, 1.0).unwrap_err();
    assert_eq!(err.code(), "invalid-confidence-level");
    let err = "studentized".parse::<CiMethod>().unwrap_err();
    assert_eq!(err.code(), "unknown-ci-method");
    assert_eq!(
        "bootstrap-bca".parse::<CiMethod>().expect("alias"),
        CiMethod::BootstrapBca
    );
}

#[test]
fn bootstrap_intervals_bracket_the_mean() {
    let samples = spread_sample();
    let centre = mean(&samples);
    let normal = normal_ci(centre, standard_error(&samples), 0.95).expect("normal");

    let mut rng = RngHandle::from_seed(11);
    let percentile = bootstrap_percentile_ci(&samples, 0.95, 2000, &mut rng).expect("percentile");
    let mut rng = RngHandle::from_seed(11);
    let bca = bootstrap_bca_ci(&samples, 0.95, 2000, &mut rng).expect("bca");

    for ci in [percentile, bca] {
        assert!(ci.low_raw < centre && centre < ci.high_raw, "{ci:?}");
        let ratio = ci.width() / normal.width();
        assert!((0.7..1.3).contains(&ratio), "width ratio {ratio}");
    }
    assert_eq!(percentile.method, CiMethod::BootstrapPercentile);
}

#[test]
fn degenerate_bootstrap_falls_back() {
    let mut rng = RngHandle::from_seed(3);
    let constant = vec![0.5; 20];
    let ci = bootstrap_bca_ci(&constant, 0.95, 200, &mut rng).expect("bca");
    assert_eq!(ci.method, CiMethod::BootstrapPercentile);
    assert_relative_eq!(ci.low_raw, 0.5, epsilon = 1e-12);
    assert_relative_eq!(ci.high_raw, 0.5, epsilon = 1e-12);

    let single = bootstrap_bca_ci(&[0.25], 0.95, 200, &mut rng).expect("bca");
    assert_eq!(single.method, CiMethod::Normal);
    assert!(single.high_raw.is_infinite());

    let err = bootstrap_percentile_ci(&constant, 0.95, 0, &mut rng).unwrap_err();
    assert_eq!(err.code(), "invalid-resample-count");
}

#[test]
fn spec_dispatches_on_method() {
    let samples = spread_sample();
    let spec = CiSpec::default();
    assert_eq!(spec.level, 0.95);
    let mut rng = RngHandle::from_seed(5);
    let ci = spec
        .interval(&samples, mean(&samples), standard_error(&samples), &mut rng)
        .expect("interval");
    assert_eq!(ci.method, CiMethod::Normal);

    let parsed: CiSpec = serde_json::from_str(r#"{"method":"bootstrap_bca"}"#).expect("spec");
    assert_eq!(parsed.n_resamples, 1000);
    parsed.validate().expect("valid");
}

proptest! {
    #[test]
    fn wider_level_gives_wider_interval(
        estimate in -1.0f64..1.0,
        se in 1e-4f64..0.5,
    ) {
        let narrow = normal_ci(estimate, se, 0.95).unwrap();
        let wide = normal_ci(estimate, se, 0.99).unwrap();
        prop_assert!(wide.width() >= narrow.width());
        prop_assert!(wide.low_clamped <= narrow.low_clamped);
        prop_assert!(wide.high_clamped >= narrow.high_clamped);
    }
}
