#![allow(dead_code)]

use qsb_exp::BenchmarkConfig;

pub const SMALL_CONFIG: &str = r#"
name: product-panel
observables:
  - { id: zz01, pauli: ZZI, coefficient: 1.0 }
  - { id: xx12, pauli: IXX, coefficient: 0.5 }
  - { id: y0, pauli: YII, coefficient: 1.0 }
  - { id: z2, pauli: IIZ, coefficient: -0.75 }
circuit:
  label: product
  num_qubits: 3
  prep:
    kind: product
    angles: [[0.7, 1.2], [1.9, 0.3], [2.4, -0.8]]
protocols: [direct_grouped, classical_shadows]
protocol_options:
  grouping: sorted_insertion
budgets: [600, 150, 300]
replicates: 4
seed: 17
task:
  epsilon: 0.5
  delta: 0.25
  criterion: { kind: truth_error }
adaptive:
  batch_size: 50
  thresholds: [0.6, 0.9]
  n_mc: 400
scheduler:
  parallelism: 2
"#;

pub fn small_config() -> BenchmarkConfig {
    BenchmarkConfig::from_yaml_str(SMALL_CONFIG).expect("config")
}
