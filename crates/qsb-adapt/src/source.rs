use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_core::{derive_labelled_seed, derive_substream_seed, QsbError};
use qsb_obs::ObservableSet;
use qsb_proto::{ObservableEstimate, ProtocolRegistry};
use qsb_stats::mean;
use tracing::debug;

use crate::reestimate::reestimate_prefix;
use crate::store::RawShotStore;

/// Supplies per-observable absolute errors of a protocol at a shot count.
pub trait ErrorSource: Send + Sync {
    /// Absolute errors for `protocol_id` after `shots` shots in `replicate_id`.
    ///
    /// An empty vector means no data is available.
    fn errors(&self, protocol_id: &str, shots: usize, replicate_id: u64) -> Result<Vec<f64>, QsbError>;

    /// Mean absolute error, `NaN` without data.
    fn quality(&self, protocol_id: &str, shots: usize, replicate_id: u64) -> Result<f64, QsbError> {
        Ok(mean(&self.errors(protocol_id, shots, replicate_id)?))
    }
}

/// Finite `|estimate − truth|` for observables present in the truth table.
pub fn absolute_errors(estimates: &[ObservableEstimate], truth: &BTreeMap<String, f64>) -> Vec<f64> {
    estimates
        .iter()
        .filter_map(|estimate| {
            truth
                .get(&estimate.observable_id)
                .map(|value| (estimate.estimate - value).abs())
        })
        .filter(|error| error.is_finite())
        .collect()
}

/// Errors re-estimated from prefixes of stored runs.
#[derive(Debug, Clone)]
pub struct SubsampledErrorSource {
    store: Arc<RawShotStore>,
    registry: Arc<ProtocolRegistry>,
    set: Arc<ObservableSet>,
    truth: Arc<BTreeMap<String, f64>>,
}

impl SubsampledErrorSource {
    /// Creates a source over a filled store.
    pub fn new(
        store: Arc<RawShotStore>,
        registry: Arc<ProtocolRegistry>,
        set: Arc<ObservableSet>,
        truth: Arc<BTreeMap<String, f64>>,
    ) -> Self {
        Self {
            store,
            registry,
            set,
            truth,
        }
    }
}

impl ErrorSource for SubsampledErrorSource {
    fn errors(&self, protocol_id: &str, shots: usize, replicate_id: u64) -> Result<Vec<f64>, QsbError> {
        let protocol = self.registry.get(protocol_id)?;
        let Some(stored) = self.store.stored_budget(protocol_id, replicate_id) else {
            debug!(protocol = protocol_id, replicate_id, "no stored run, empty error array");
            return Ok(Vec::new());
        };
        let records = self.store.records(protocol_id, replicate_id);
        if stored == 0 || records.is_empty() {
            return Ok(Vec::new());
        }
        let frac = shots as f64 / stored as f64;
        let seed = derive_substream_seed(derive_labelled_seed(replicate_id, protocol_id), shots as u64);
        let estimates = reestimate_prefix(protocol.as_ref(), Arc::clone(&self.set), &records, frac, seed)?;
        Ok(absolute_errors(&estimates, &self.truth))
    }
}

/// Fixed error arrays keyed by protocol and shot count, mainly for scenarios
/// whose error curves are known in closed form.
#[derive(Debug, Clone, Default)]
pub struct TabulatedErrorSource {
    table: BTreeMap<String, BTreeMap<usize, Vec<f64>>>,
}

impl TabulatedErrorSource {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the error array of `protocol_id` at `shots`.
    pub fn insert(&mut self, protocol_id: &str, shots: usize, errors: Vec<f64>) {
        self.table
            .entry(protocol_id.to_string())
            .or_default()
            .insert(shots, errors);
    }

    /// Builder form of [`TabulatedErrorSource::insert`].
    pub fn with(mut self, protocol_id: &str, shots: usize, errors: Vec<f64>) -> Self {
        self.insert(protocol_id, shots, errors);
        self
    }
}

impl ErrorSource for TabulatedErrorSource {
    /// Uses the largest tabulated shot count not above `shots`, ignoring replicates.
    fn errors(&self, protocol_id: &str, shots: usize, _replicate_id: u64) -> Result<Vec<f64>, QsbError> {
        Ok(self
            .table
            .get(protocol_id)
            .and_then(|curve| curve.range(..=shots).next_back())
            .map(|(_, errors)| errors.clone())
            .unwrap_or_default())
    }
}
