#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_adapt::RawShotStore;
use qsb_obs::ObservableSet;
use qsb_proto::{run_protocol, truth_table, CircuitSpec, ProtocolOptions, ProtocolRegistry, ProtocolRun, StatePrep};
use qsb_sim::StatevectorSampler;

pub struct StoredFixture {
    pub set: Arc<ObservableSet>,
    pub circuit: CircuitSpec,
    pub registry: Arc<ProtocolRegistry>,
    pub truth: Arc<BTreeMap<String, f64>>,
    pub store: RawShotStore,
    pub runs: Vec<(u64, ProtocolRun)>,
}

pub fn fixture() -> (Arc<ObservableSet>, CircuitSpec) {
    let set = ObservableSet::from_labels([
        ("zz01", "ZZI", 1.0),
        ("xx12", "IXX", 0.5),
        ("y0", "YII", 1.0),
        ("z2", "IIZ", -0.75),
    ])
    .expect("set");
    let circuit = CircuitSpec::new(
        "product",
        3,
        StatePrep::Product {
            angles: vec![(0.7, 1.2), (1.9, 0.3), (2.4, -0.8)],
        },
    )
    .expect("circuit");
    (Arc::new(set), circuit)
}

/// Runs `protocols` at `budget` for each replicate and stores every run.
pub fn stored(protocols: &[&str], budget: usize, replicates: u64) -> StoredFixture {
    let (set, circuit) = fixture();
    let sampler = StatevectorSampler::ideal();
    let truth = truth_table(&sampler, &circuit, &set).expect("truth");
    let registry = ProtocolRegistry::with_defaults(&ProtocolOptions {
        ci: None,
        ..ProtocolOptions::default()
    });
    let mut store = RawShotStore::new();
    let mut runs = Vec::new();
    for id in protocols {
        let protocol = registry.get(id).expect("protocol");
        for replicate in 0..replicates {
            let run = run_protocol(
                protocol.as_ref(),
                Arc::clone(&set),
                &circuit,
                &sampler,
                budget,
                500 + replicate,
            )
            .expect("run");
            store.insert_run(&run, replicate);
            runs.push((replicate, run));
        }
    }
    StoredFixture {
        set,
        circuit,
        registry: Arc::new(registry),
        truth: Arc::new(truth),
        store,
        runs,
    }
}
