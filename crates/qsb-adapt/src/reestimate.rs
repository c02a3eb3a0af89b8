use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_core::{ErrorInfo, QsbError};
use qsb_obs::ObservableSet;
use qsb_proto::{ObservableEstimate, Protocol, RawDatasetChunk};
use tracing::trace;

use crate::store::RawShotRecord;

/// Rebuilds one chunk from the `frac` prefix of every stored setting.
pub fn prefix_chunk(
    records: &[&RawShotRecord],
    frac: f64,
    num_qubits: usize,
) -> Result<RawDatasetChunk, QsbError> {
    if let Some(record) = records.iter().find(|r| r.measurement_bases.is_some()) {
        if records.len() != 1 {
            return Err(QsbError::Data(
                ErrorInfo::new("mixed-record-families", "randomized records cannot share a run with fixed settings")
                    .with_context("protocol", record.protocol_id.clone())
                    .with_context("records", records.len().to_string()),
            ));
        }
        let prefix = record.prefix(frac);
        let bases = prefix.measurement_bases.unwrap_or_default();
        if bases.len() != prefix.bitstrings.len() {
            return Err(QsbError::Data(
                ErrorInfo::new("malformed-shadow-chunk", "stored bases and outcomes disagree in length")
                    .with_context("outcomes", prefix.bitstrings.len().to_string())
                    .with_context("bases", bases.len().to_string()),
            ));
        }
        return RawDatasetChunk::shadow_from_bitstrings(&prefix.bitstrings, bases, num_qubits);
    }
    let outcomes: BTreeMap<String, Vec<String>> = records
        .iter()
        .map(|record| {
            let prefix = record.prefix(frac);
            (prefix.setting_id, prefix.bitstrings)
        })
        .collect();
    Ok(RawDatasetChunk::Direct { outcomes })
}

/// Replays the `frac` prefix of a stored run through the protocol's own
/// `initialize → update → finalize` with a budget equal to the prefix shots.
pub fn reestimate_prefix(
    protocol: &dyn Protocol,
    set: Arc<ObservableSet>,
    records: &[&RawShotRecord],
    frac: f64,
    seed: u64,
) -> Result<Vec<ObservableEstimate>, QsbError> {
    let chunk = prefix_chunk(records, frac, set.num_qubits())?;
    let shots = chunk.n_shots();
    let state = protocol.initialize(Arc::clone(&set), shots, seed)?;
    let state = protocol.update(state, chunk)?;
    trace!(protocol = protocol.id(), frac, shots, "re-estimated stored prefix");
    protocol.finalize(&state, &set)
}
