use approx::assert_relative_eq;
use qsb_stats::{
    construct_simultaneous_cis, holm_reject, individual_alpha, individual_confidence,
    z_test_p_value, FwerMethod,
};

#[test]
fn bonferroni_ten_observables() {
    let level = individual_confidence(0.05, 10, FwerMethod::Bonferroni).expect("level");
    assert_relative_eq!(level, 1.0 - 0.005, epsilon = 1e-15);
    // Holm has no p-values here and degrades to Bonferroni.
    let holm = individual_confidence(0.05, 10, FwerMethod::Holm).expect("level");
    assert_eq!(holm, level);
}

#[test]
fn sidak_is_slightly_less_conservative() {
    let sidak = individual_alpha(0.05, 10, FwerMethod::Sidak).expect("alpha");
    let bonferroni = individual_alpha(0.05, 10, FwerMethod::Bonferroni).expect("alpha");
    assert!(sidak > bonferroni);
    assert_relative_eq!(1.0 - (1.0 - sidak).powi(10), 0.05, epsilon = 1e-12);
}

#[test]
fn invalid_families_are_rejected() {
    assert_eq!(
        individual_alpha(0.05, 0, FwerMethod::Sidak).unwrap_err().code(),
        "empty-family"
    );
    assert_eq!(
        individual_alpha(1.5, 3, FwerMethod::Bonferroni).unwrap_err().code(),
        "invalid-alpha"
    );
    assert_eq!(
        "hochberg".parse::<FwerMethod>().unwrap_err().code(),
        "unknown-fwer-method"
    );
}

#[test]
fn holm_steps_down() {
    // Thresholds: 0.05/4, 0.05/3, 0.05/2, 0.05/1.
    let p = [0.03, 0.001, 0.2, 0.014];
    let rejected = holm_reject(&p, 0.05).expect("holm");
    assert_eq!(rejected, vec![false, true, false, true]);

    let stop_early = holm_reject(&[0.03, 0.001, f64::NAN], 0.05).expect("holm");
    assert_eq!(stop_early, vec![false, true, false]);
}

#[test]
fn z_test_edges() {
    assert_relative_eq!(z_test_p_value(1.959_963_984_540_054, 1.0, 0.0), 0.05, epsilon = 1e-9);
    assert_eq!(z_test_p_value(0.3, f64::INFINITY, 0.0), 1.0);
    assert_eq!(z_test_p_value(0.3, 0.0, 0.0), 0.0);
}

#[test]
fn simultaneous_intervals_use_adjusted_level() {
    let estimates = vec![(0.10, 0.01), (0.52, 0.02), (-0.30, 0.015)];
    let family = construct_simultaneous_cis(&estimates, 0.05, FwerMethod::Bonferroni)
        .expect("family");
    assert_eq!(family.intervals.len(), 3);
    assert_relative_eq!(family.individual_level, 1.0 - 0.05 / 3.0, epsilon = 1e-15);
    assert_relative_eq!(family.family_level, 0.95, epsilon = 1e-15);
    assert!(family.all_contain(&[0.11, 0.5, -0.31]));
    assert!(!family.all_contain(&[0.11, 0.5, 0.3]));
    assert!(!family.all_contain(&[0.11, 0.5]));

    let single = construct_simultaneous_cis(&estimates[..1], 0.05, FwerMethod::Bonferroni)
        .expect("single");
    assert!(family.intervals[0].half_width() > single.intervals[0].half_width());
    assert!(family.max_half_width() >= family.intervals[1].half_width());
}
