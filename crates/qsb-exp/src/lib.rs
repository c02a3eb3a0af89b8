#![deny(missing_docs)]
#![doc = "Benchmark orchestration: YAML configuration, parallel sweeps, task evaluation, adaptive studies and report export."]

/// YAML benchmark configuration.
pub mod config;
/// CSV and JSON export.
pub mod export;
/// Report types.
pub mod report;
/// Parallel sweep and replay verification.
pub mod sweep;

use std::path::Path;
use std::sync::Arc;

use qsb_adapt::{run_regret_study, SubsampledErrorSource};
use qsb_core::QsbError;
use qsb_proto::truth_table;
use qsb_task::{bias_variance, dominance, evaluate_protocols, PowerLawFit};
use tracing::info;

pub use config::{load_config, AdaptiveSpec, BenchmarkConfig, Scheduler};
pub use export::{read_rows_csv, write_json, write_rows_csv, ROW_COLUMNS};
pub use report::{provenance, BenchmarkReport, BudgetSummary, ScalingSummary, COVERAGE_ALPHA, REPORT_SCHEMA};
pub use sweep::{
    job_seed, run_sweep, sweep_budgets, verify_full_budget, JobOutcome, SweepOutput, VerificationSummary,
};

/// Report file name inside the output directory.
pub const REPORT_FILE: &str = "report.json";
/// Rows CSV file name inside the output directory.
pub const ROWS_FILE: &str = "rows.csv";
/// Raw-shot store file name inside the output directory.
pub const RAW_SHOTS_FILE: &str = "raw_shots.json";

/// Validates `config`, runs the sweep and every configured analysis.
///
/// With `out` set, writes the report, the rows CSV and the raw-shot store.
pub fn run_benchmark(config: &BenchmarkConfig, out: Option<&Path>) -> Result<BenchmarkReport, QsbError> {
    config.validate()?;
    let set = config.observable_set()?;
    let registry = Arc::new(config.registry());
    let sampler = config.sampler()?;
    let truth = Arc::new(truth_table(&sampler, &config.circuit, &set)?);

    let output = run_sweep(config, &set, &registry, &sampler)?;
    let rows = output.rows(&truth);

    let mut summaries = Vec::new();
    for protocol_id in &config.protocols {
        for n_total in sweep_budgets(config) {
            let jobs: Vec<&JobOutcome> = output
                .jobs
                .iter()
                .filter(|job| job.protocol_id == *protocol_id && job.n_total == n_total)
                .collect();
            summaries.push(BudgetSummary::from_jobs(protocol_id, n_total, &jobs, &truth));
        }
    }

    let scaling = config
        .protocols
        .iter()
        .map(|protocol_id| {
            let budgets = bias_variance(&rows, protocol_id);
            let fit = PowerLawFit::from_budgets(&budgets);
            ScalingSummary {
                protocol_id: protocol_id.clone(),
                budgets,
                fit,
            }
        })
        .collect();

    let criterion = config.task.map(|task| task.criterion).unwrap_or_default();
    let dominance_results = config
        .protocols
        .iter()
        .filter(|id| **id != config.baseline)
        .map(|id| dominance(&rows, id, &config.baseline, &criterion))
        .collect::<Result<Vec<_>, QsbError>>()?;

    let task = config
        .task
        .as_ref()
        .map(|task| evaluate_protocols(&rows, task, &config.baseline))
        .transpose()?;

    let verification = if config.verify {
        Some(verify_full_budget(&output, &set, &registry)?)
    } else {
        None
    };

    let adaptive = match &config.adaptive {
        Some(spec) => {
            let candidates = config.adaptive_candidates();
            let source = SubsampledErrorSource::new(
                Arc::new(output.store.clone()),
                Arc::clone(&registry),
                Arc::clone(&set),
                Arc::clone(&truth),
            );
            let replicates: Vec<u64> = (0..config.replicates).collect();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.scheduler.parallelism.max(1))
                .build()
                .map_err(sweep::pool_error)?;
            let study = pool.install(|| {
                run_regret_study(
                    &source,
                    &candidates,
                    &spec.selector_config(config.max_budget()),
                    &spec.thresholds,
                    &replicates,
                    config.seed,
                )
            })?;
            Some(study)
        }
        None => None,
    };

    let report = BenchmarkReport {
        schema: REPORT_SCHEMA,
        name: config.name.clone(),
        provenance: provenance(config.config_hash()?, set.canonical_hash()?, config.seed),
        truth: (*truth).clone(),
        summaries,
        scaling,
        dominance: dominance_results,
        task,
        adaptive,
        verification,
    };
    info!(
        name = %report.name,
        summaries = report.summaries.len(),
        rows = rows.len(),
        "benchmark complete"
    );

    if let Some(out) = out {
        write_json(&out.join(REPORT_FILE), &report)?;
        write_rows_csv(&out.join(ROWS_FILE), &rows)?;
        output.store.save(&out.join(RAW_SHOTS_FILE))?;
    }
    Ok(report)
}
