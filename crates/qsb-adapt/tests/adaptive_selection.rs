mod common;

use std::sync::Arc;

use proptest::prelude::*;
use qsb_adapt::{
    run_regret_study, AdaptiveConfig, AdaptiveSelector, SelectorPhase, SubsampledErrorSource,
    TabulatedErrorSource,
};
use qsb_core::RngHandle;
use qsb_proto::{CLASSICAL_SHADOWS, DIRECT_GROUPED};

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn config(batch_size: usize, threshold: f64, total_budget: usize) -> AdaptiveConfig {
    AdaptiveConfig {
        batch_size,
        threshold,
        n_mc: 2000,
        total_budget,
    }
}

/// Five observables per protocol near 0.02, 0.05 and 0.10 with ~1e-4 spread.
fn panel() -> TabulatedErrorSource {
    let around = |centre: f64| vec![centre - 2e-4, centre - 1e-4, centre, centre + 1e-4, centre + 2e-4];
    TabulatedErrorSource::new()
        .with("good", 200, around(0.02))
        .with("mid", 200, around(0.05))
        .with("bad", 200, around(0.10))
}

#[test]
fn single_observable_scenario_forces_commit_at_the_cap() {
    let source = TabulatedErrorSource::new()
        .with("a", 100, vec![0.10])
        .with("b", 100, vec![0.11]);
    let selector = AdaptiveSelector::new(config(100, 0.95, 1000), ids(&["a", "b"])).expect("selector");
    assert_eq!(selector.max_steps(), 5);
    let mut rng = RngHandle::from_seed(11);
    let outcome = selector.run(&source, 0, &mut rng).expect("run");
    assert!(outcome.forced);
    assert_eq!(outcome.commit_step, 5);
    assert_eq!(outcome.exploration_shots, 1000);
    assert_eq!(outcome.final_shots, 500);
    assert_eq!(outcome.history.len(), 5);
    assert_eq!(outcome.selected, "a");
}

#[test]
fn one_observable_per_protocol_panel_is_resolved_by_location() {
    let source = TabulatedErrorSource::new()
        .with("p010", 200, vec![0.10])
        .with("p005", 200, vec![0.05])
        .with("p002", 200, vec![0.02]);
    let replicates: Vec<u64> = (0..20).collect();
    let study = run_regret_study(
        &source,
        &ids(&["p010", "p005", "p002"]),
        &config(200, 0.95, 6000),
        &[0.95],
        &replicates,
        2024,
    )
    .expect("study");
    let summary = &study.summaries[0];
    assert_eq!(summary.n_runs, 20);
    assert_eq!(summary.accuracy, 1.0);
    assert_eq!(summary.pooled_accuracy, 1.0);
    assert_eq!(summary.mean_regret, 0.0);
    assert_eq!(summary.forced_commit_rate, 1.0);
    assert_eq!(summary.mean_commit_step, 10.0);
    assert_eq!(study.pooled_oracle.as_deref(), Some("p002"));
    assert!(study.records.iter().all(|r| r.selected == "p002" && r.final_shots == 2000));
}

#[test]
fn separated_panel_commits_at_the_first_step() {
    let selector = AdaptiveSelector::new(config(200, 0.95, 6000), ids(&["bad", "good", "mid"])).expect("selector");
    let mut rng = RngHandle::from_seed(5);
    let outcome = selector.run(&panel(), 0, &mut rng).expect("run");
    assert_eq!(outcome.selected, "good");
    assert!(!outcome.forced);
    assert_eq!(outcome.commit_step, 1);
    assert_eq!(outcome.exploration_shots, 600);
    assert_eq!(outcome.final_shots, 200 + 5400);
    assert_eq!(outcome.history[0].p_best, vec![0.0, 1.0, 0.0]);
}

#[test]
fn committed_selector_ignores_further_steps() {
    let mut selector = AdaptiveSelector::new(config(200, 0.5, 6000), ids(&["good", "bad"])).expect("selector");
    let source = panel();
    let mut rng = RngHandle::from_seed(2);
    let phase = selector.step(&source, 0, &mut rng).expect("step").clone();
    let expected = SelectorPhase::Committed {
        protocol: "good".to_string(),
        step: 1,
        forced: false,
    };
    assert_eq!(phase, expected);
    assert_eq!(selector.step(&source, 0, &mut rng).expect("step"), &expected);
}

#[test]
fn invalid_configurations_fail_fast() {
    let cases = [
        (config(0, 0.9, 1000), 2, "invalid-batch-size"),
        (config(100, 1.0, 1000), 2, "invalid-threshold"),
        (config(100, 0.0, 1000), 2, "invalid-threshold"),
        (config(100, f64::NAN, 1000), 2, "invalid-threshold"),
        (AdaptiveConfig { n_mc: 0, ..config(100, 0.9, 1000) }, 2, "invalid-mc-draws"),
        (config(100, 0.9, 1000), 0, "empty-candidates"),
        (config(100, 0.9, 150), 2, "zero-max-steps"),
    ];
    for (config, candidates, code) in cases {
        let err = config.validate(candidates).unwrap_err();
        assert_eq!(err.code(), code);
    }
}

#[test]
fn config_defaults_monte_carlo_draws() {
    let config: AdaptiveConfig =
        serde_json::from_str(r#"{"batch_size": 50, "threshold": 0.9, "total_budget": 3000}"#).expect("config");
    assert_eq!(config.n_mc, 2000);
}

#[test]
fn regret_study_over_the_panel_is_exact() {
    let study = run_regret_study(
        &panel(),
        &ids(&["bad", "good", "mid"]),
        &config(200, 0.95, 6000),
        &[0.6, 0.95],
        &[0, 1, 2, 3, 4, 5, 6, 7],
        42,
    )
    .expect("study");
    assert_eq!(study.records.len(), 16);
    assert_eq!(study.summaries.len(), 2);
    for summary in &study.summaries {
        assert_eq!(summary.n_runs, 8);
        assert_eq!(summary.accuracy, 1.0);
        assert_eq!(summary.pooled_accuracy, 1.0);
        assert_eq!(summary.mean_regret, 0.0);
        assert_eq!(summary.mean_commit_step, 1.0);
        assert_eq!(summary.mean_exploration_shots, 600.0);
        assert_eq!(summary.forced_commit_rate, 0.0);
    }
    assert!(study.records.windows(2).all(|w| w[0].threshold_index <= w[1].threshold_index));
}

#[test]
fn regret_study_is_deterministic_per_seed() {
    let source = TabulatedErrorSource::new()
        .with("a", 100, vec![0.10])
        .with("b", 100, vec![0.11]);
    let run = || {
        run_regret_study(&source, &ids(&["a", "b"]), &config(100, 0.9, 1000), &[0.7, 0.9], &[0, 1, 2], 7)
            .expect("study")
    };
    let first = run();
    assert_eq!(first, run());
    assert!(first.summaries.iter().all(|s| s.forced_commit_rate == 1.0));
}

#[test]
fn subsampled_regret_study_respects_the_budget() {
    let fixture = common::stored(&[DIRECT_GROUPED, CLASSICAL_SHADOWS], 1200, 3);
    let source = SubsampledErrorSource::new(
        Arc::new(fixture.store),
        fixture.registry,
        fixture.set,
        fixture.truth,
    );
    let study = run_regret_study(
        &source,
        &ids(&[DIRECT_GROUPED, CLASSICAL_SHADOWS]),
        &config(100, 0.9, 1200),
        &[0.8],
        &[0, 1, 2],
        3,
    )
    .expect("study");
    assert_eq!(study.records.len(), 3);
    for record in &study.records {
        assert!(record.commit_step >= 1 && record.commit_step <= 6);
        assert!(record.final_shots <= 1200);
        assert!(record.oracle.is_some());
        assert!(record.regret.is_finite());
    }
    let summary = &study.summaries[0];
    assert!((0.0..=1.0).contains(&summary.accuracy));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn commits_never_exceed_the_budget(
        errors in prop::collection::vec(prop::collection::vec(0.0f64..0.5, 0..4), 2..4),
        batch in 10usize..80,
        total in 200usize..1200,
        threshold in 0.3f64..0.99,
        seed in any::<u64>(),
    ) {
        let names: Vec<String> = (0..errors.len()).map(|i| format!("p{i}")).collect();
        let mut source = TabulatedErrorSource::new();
        for (name, errs) in names.iter().zip(&errors) {
            source.insert(name, batch, errs.clone());
        }
        let cfg = config(batch, threshold, total);
        prop_assume!(cfg.validate(names.len()).is_ok());
        let selector = AdaptiveSelector::new(cfg, names.clone()).unwrap();
        let max_steps = selector.max_steps();
        let mut rng = RngHandle::from_seed(seed);
        let outcome = selector.run(&source, 0, &mut rng).unwrap();
        prop_assert!(outcome.commit_step >= 1 && outcome.commit_step <= max_steps);
        prop_assert_eq!(outcome.forced, outcome.history.last().map_or(true, |h| {
            h.p_best.iter().copied().fold(0.0, f64::max) < threshold
        }));
        let remaining = total - outcome.exploration_shots;
        prop_assert_eq!(outcome.final_shots, outcome.commit_step * batch + remaining);
        prop_assert!(outcome.final_shots <= total);
        prop_assert!(names.contains(&outcome.selected));
    }
}
