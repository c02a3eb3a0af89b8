mod common;

use approx::assert_relative_eq;
use common::{error_grid, row};
use proptest::prelude::*;
use qsb_stats::{individual_confidence, z_critical, FwerMethod};
use qsb_task::{evaluate_protocols, shot_savings_factor, Criterion, NStarTask};

fn two_budget_rows(protocol: &str) -> Vec<qsb_task::BudgetRow> {
    error_grid(
        protocol,
        &[100, 200],
        &[
            vec![
                vec![0.01, 0.15],
                vec![0.05, 0.05],
                vec![0.05, 0.05],
                vec![0.05, 0.05],
            ],
            vec![vec![0.05, 0.08]; 4],
        ],
    )
}

#[test]
fn worst_case_needs_every_observable_within_epsilon() {
    let rows = two_budget_rows("p");
    let task = NStarTask::worst_case(0.1, 0.1, Criterion::TruthError);
    let result = task.evaluate(&rows, "p").expect("n*");
    assert_eq!(result.n_star, Some(200));
    assert_eq!(result.success_fraction[&100], 0.75);
    assert_eq!(result.success_fraction[&200], 1.0);
}

#[test]
fn average_case_is_never_stricter() {
    let rows = two_budget_rows("p");
    let task = NStarTask::average_case(0.1, 0.1, Criterion::TruthError);
    let result = task.evaluate(&rows, "p").expect("n*");
    assert_eq!(result.n_star, Some(100));
}

#[test]
fn unreachable_precision_yields_none() {
    let rows = two_budget_rows("p");
    let task = NStarTask::worst_case(0.01, 0.0, Criterion::TruthError);
    let result = task.evaluate(&rows, "p").expect("n*");
    assert_eq!(result.n_star, None);
    assert_eq!(result.success_fraction.len(), 2);
}

#[test]
fn non_finite_or_missing_metrics_fail_the_replicate() {
    let mut rows = error_grid("p", &[100], &[vec![vec![0.01], vec![0.01]]]);
    rows[1].estimate = f64::NAN;
    let task = NStarTask::worst_case(0.1, 0.0, Criterion::TruthError);
    let result = task.evaluate(&rows, "p").expect("n*");
    assert_eq!(result.success_fraction[&100], 0.5);
    assert_eq!(result.n_star, None);

    let no_truth = vec![row("p", 100, 0, "o0", 0.0, None)];
    let result = task.evaluate(&no_truth, "p").expect("n*");
    assert_eq!(result.success_fraction[&100], 0.0);
}

#[test]
fn ci_half_width_uses_the_adjusted_level() {
    let rows = vec![
        row("p", 100, 0, "a", 0.3, None),
        row("p", 100, 0, "b", -0.2, None),
    ];
    let refs: Vec<&qsb_task::BudgetRow> = rows.iter().collect();
    let criterion = Criterion::CiHalfWidth {
        alpha: 0.05,
        fwer: FwerMethod::Bonferroni,
    };
    let metrics = criterion.replicate_metrics(&refs).expect("metrics");
    let z = z_critical(individual_confidence(0.05, 2, FwerMethod::Bonferroni).unwrap()).unwrap();
    assert_eq!(metrics.len(), 2);
    assert_relative_eq!(metrics[0], z * 0.01, epsilon = 1e-12);
    assert!(z > 2.2 && z < 2.3);

    let task = NStarTask::worst_case(0.025, 0.0, criterion);
    assert_eq!(task.evaluate(&rows, "p").unwrap().n_star, Some(100));
}

#[test]
fn invalid_parameters_fail_fast() {
    for task in [
        NStarTask::worst_case(0.0, 0.05, Criterion::TruthError),
        NStarTask::worst_case(f64::NAN, 0.05, Criterion::TruthError),
        NStarTask::worst_case(0.1, 1.0, Criterion::TruthError),
        NStarTask::worst_case(0.1, -0.1, Criterion::TruthError),
    ] {
        assert_eq!(task.validate().unwrap_err().code(), "invalid-task-parameter");
    }
    let bad_alpha = NStarTask::worst_case(
        0.1,
        0.05,
        Criterion::CiHalfWidth {
            alpha: 0.0,
            fwer: FwerMethod::Sidak,
        },
    );
    assert_eq!(bad_alpha.validate().unwrap_err().code(), "invalid-alpha");
}

#[test]
fn task_deserializes_with_defaults() {
    let task: NStarTask = serde_json::from_str(r#"{"epsilon": 0.05}"#).expect("task");
    assert_eq!(task.delta, 0.05);
    assert_eq!(task.criterion, Criterion::default());
    assert_eq!(task.aggregation.as_str(), "worst_case");

    let task: NStarTask = serde_json::from_str(
        r#"{"epsilon": 0.05, "criterion": {"kind": "truth_error"}, "aggregation": "average_case"}"#,
    )
    .expect("task");
    assert_eq!(task.criterion, Criterion::TruthError);
}

#[test]
fn shot_savings_factor_rules() {
    assert_eq!(shot_savings_factor(Some(1000), Some(250)), Some(4.0));
    assert_eq!(shot_savings_factor(Some(1000), Some(0)), Some(f64::INFINITY));
    assert_eq!(shot_savings_factor(None, Some(250)), None);
    assert_eq!(shot_savings_factor(Some(1000), None), None);
}

#[test]
fn evaluate_protocols_reports_ssf_against_baseline() {
    let mut rows = two_budget_rows("baseline");
    rows.extend(error_grid("fast", &[100], &[vec![vec![0.02, 0.02]; 4]]));
    let task = NStarTask::worst_case(0.1, 0.1, Criterion::TruthError);
    let evaluation = evaluate_protocols(&rows, &task, "baseline").expect("evaluation");
    assert_eq!(evaluation.protocols.len(), 2);
    assert_eq!(evaluation.protocols["baseline"].shot_savings_factor, Some(1.0));
    assert_eq!(evaluation.protocols["fast"].n_star.n_star, Some(100));
    assert_eq!(evaluation.protocols["fast"].shot_savings_factor, Some(2.0));

    let err = evaluate_protocols(&rows, &task, "direct_grouped").unwrap_err();
    assert_eq!(err.code(), "missing-baseline");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn n_star_is_monotone_in_epsilon(
        errors in prop::collection::vec(
            prop::collection::vec(prop::collection::vec(0.0f64..1.0, 3), 5),
            1..5,
        ),
        tight in 0.05f64..0.5,
        slack in 0.0f64..0.5,
    ) {
        let budgets: Vec<usize> = (1..=errors.len()).map(|i| i * 100).collect();
        let rows = error_grid("p", &budgets, &errors);
        let strict = NStarTask::worst_case(tight, 0.2, Criterion::TruthError)
            .evaluate(&rows, "p")
            .unwrap();
        let loose = NStarTask::worst_case(tight + slack, 0.2, Criterion::TruthError)
            .evaluate(&rows, "p")
            .unwrap();
        if let Some(n) = strict.n_star {
            prop_assert!(loose.n_star.is_some_and(|m| m <= n));
        }
    }
}
