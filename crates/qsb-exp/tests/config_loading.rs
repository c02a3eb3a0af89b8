mod common;

use std::fs;

use common::{small_config, SMALL_CONFIG};
use qsb_exp::{load_config, BenchmarkConfig};
use qsb_obs::GroupingMethod;

#[test]
fn yaml_fills_defaults() {
    let config = small_config();
    assert_eq!(config.name, "product-panel");
    assert_eq!(config.baseline, "direct_grouped");
    assert_eq!(config.protocol_options.grouping, GroupingMethod::SortedInsertion);
    assert!(config.protocol_options.ci.is_some());
    assert_eq!(config.readout_error, 0.0);
    assert!(config.verify);
    assert_eq!(config.max_budget(), 600);
    let adaptive = config.adaptive.as_ref().expect("adaptive");
    assert_eq!(adaptive.total_budget, None);
    assert_eq!(adaptive.selector_config(config.max_budget()).total_budget, 600);
    assert_eq!(config.adaptive_candidates(), vec!["direct_grouped", "classical_shadows"]);
    config.validate().expect("valid");
}

#[test]
fn minimal_yaml_uses_every_protocol() {
    let config = BenchmarkConfig::from_yaml_str(
        r#"
observables: [{ id: z, pauli: Z, coefficient: 1.0 }]
circuit: { label: zero, num_qubits: 1, prep: { kind: zero } }
budgets: [10]
"#,
    )
    .expect("config");
    assert_eq!(config.protocols.len(), 4);
    assert_eq!(config.replicates, 10);
    assert_eq!(config.scheduler.parallelism, 1);
    config.validate().expect("valid");
}

#[test]
fn load_config_reads_and_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bench.yaml");
    fs::write(&path, SMALL_CONFIG).expect("write");
    let config = load_config(&path).expect("load");
    assert_eq!(config, small_config());

    let missing = load_config(dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(missing.code(), "config-read");

    fs::write(&path, "observables: [").expect("write");
    assert_eq!(load_config(&path).unwrap_err().code(), "yaml-deserialize");
}

#[test]
fn yaml_round_trip_keeps_the_hash() {
    let config = small_config();
    let again = BenchmarkConfig::from_yaml_str(&config.to_yaml_string().expect("yaml")).expect("parse");
    assert_eq!(again, config);
    assert_eq!(again.config_hash().unwrap(), config.config_hash().unwrap());
}

#[test]
fn configuration_errors_fail_fast() {
    let cases: Vec<(Box<dyn Fn(&mut BenchmarkConfig)>, &str)> = vec![
        (Box::new(|c: &mut BenchmarkConfig| c.budgets.clear()), "invalid-budget"),
        (Box::new(|c: &mut BenchmarkConfig| c.budgets.push(0)), "invalid-budget"),
        (Box::new(|c: &mut BenchmarkConfig| c.replicates = 0), "invalid-replicates"),
        (Box::new(|c: &mut BenchmarkConfig| c.scheduler.parallelism = 0), "invalid-parallelism"),
        (Box::new(|c: &mut BenchmarkConfig| c.protocols = vec!["direct_grouped".into(), "magic".into()]), "unknown-protocol"),
        (Box::new(|c: &mut BenchmarkConfig| c.baseline = "direct_naive".into()), "missing-baseline"),
        (Box::new(|c: &mut BenchmarkConfig| c.circuit.num_qubits = 2), "circuit-prep-mismatch"),
        (Box::new(|c: &mut BenchmarkConfig| c.readout_error = 0.7), "invalid-readout-error"),
        (Box::new(|c: &mut BenchmarkConfig| c.observables.clear()), "observable-set-empty"),
        (
            Box::new(|c: &mut BenchmarkConfig| {
                if let Some(task) = c.task.as_mut() {
                    task.delta = 1.0;
                }
            }),
            "invalid-task-parameter",
        ),
        (
            Box::new(|c: &mut BenchmarkConfig| {
                if let Some(spec) = c.adaptive.as_mut() {
                    spec.thresholds.push(1.0);
                }
            }),
            "invalid-threshold",
        ),
        (
            Box::new(|c: &mut BenchmarkConfig| {
                if let Some(spec) = c.adaptive.as_mut() {
                    spec.batch_size = 400;
                }
            }),
            "zero-max-steps",
        ),
    ];
    for (mutate, code) in cases {
        let mut config = small_config();
        mutate(&mut config);
        assert_eq!(config.validate().unwrap_err().code(), code);
    }
}
