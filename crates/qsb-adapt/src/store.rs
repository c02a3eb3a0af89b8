//! Persisted raw shots keyed by `(protocol_id, replicate_id, setting_id)`.

use std::fs;
use std::path::Path;

use qsb_core::serde::{from_json_slice, to_canonical_json_bytes};
use qsb_core::{ErrorInfo, QsbError};
use qsb_proto::{format_bitstring, ProtocolRun, RawDatasetChunk, SHADOW_SETTING};
use serde::{Deserialize, Serialize};

fn io_error(code: &str, err: impl ToString) -> QsbError {
    QsbError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Shot-ordered outcomes of one setting in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawShotRecord {
    /// Protocol id.
    pub protocol_id: String,
    /// Replicate index.
    pub replicate_id: u64,
    /// Setting id inside the protocol layout.
    pub setting_id: String,
    /// Bitstrings in acquisition order.
    pub bitstrings: Vec<String>,
    /// Per-shot basis indices for randomized settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_bases: Option<Vec<Vec<u8>>>,
}

impl RawShotRecord {
    /// Number of stored shots.
    pub fn len(&self) -> usize {
        self.bitstrings.len()
    }

    /// Whether no shot is stored.
    pub fn is_empty(&self) -> bool {
        self.bitstrings.is_empty()
    }

    /// First `ceil(frac · len)` shots; `frac` is clamped to `[0, 1]`.
    pub fn prefix(&self, frac: f64) -> RawShotRecord {
        let keep = prefix_len(self.len(), frac);
        RawShotRecord {
            protocol_id: self.protocol_id.clone(),
            replicate_id: self.replicate_id,
            setting_id: self.setting_id.clone(),
            bitstrings: self.bitstrings[..keep].to_vec(),
            measurement_bases: self
                .measurement_bases
                .as_ref()
                .map(|bases| bases[..keep.min(bases.len())].to_vec()),
        }
    }
}

/// `ceil(frac · len)` with `frac` clamped to `[0, 1]`; `NaN` keeps nothing.
pub fn prefix_len(len: usize, frac: f64) -> usize {
    if frac.is_nan() {
        return 0;
    }
    let frac = frac.clamp(0.0, 1.0);
    ((frac * len as f64).ceil() as usize).min(len)
}

/// Stored budget of one `(protocol, replicate)` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRun {
    /// Protocol id.
    pub protocol_id: String,
    /// Replicate index.
    pub replicate_id: u64,
    /// Shots acquired by the run.
    pub budget: usize,
}

/// Append-only collection of raw shot records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawShotStore {
    runs: Vec<StoredRun>,
    records: Vec<RawShotRecord>,
}

impl RawShotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every chunk of a finished run under `replicate_id`.
    ///
    /// Direct chunks yield one record per setting; shadow chunks yield one
    /// record under the shadow setting with the per-shot bases attached.
    /// A run already stored for the same key is replaced.
    pub fn insert_run(&mut self, run: &ProtocolRun, replicate_id: u64) {
        let protocol_id = run.protocol_id.as_str();
        self.runs
            .retain(|r| !(r.protocol_id == protocol_id && r.replicate_id == replicate_id));
        self.records
            .retain(|r| !(r.protocol_id == protocol_id && r.replicate_id == replicate_id));

        for chunk in run.state.chunks() {
            match chunk {
                RawDatasetChunk::Direct { outcomes } => {
                    for (setting_id, bitstrings) in outcomes {
                        self.record_mut(protocol_id, replicate_id, setting_id)
                            .bitstrings
                            .extend(bitstrings.iter().cloned());
                    }
                }
                RawDatasetChunk::Shadow {
                    outcomes,
                    basis_choices,
                } => {
                    let record = self.record_mut(protocol_id, replicate_id, SHADOW_SETTING);
                    record
                        .bitstrings
                        .extend(outcomes.iter().map(|bits| format_bitstring(bits)));
                    record
                        .measurement_bases
                        .get_or_insert_with(Vec::new)
                        .extend(basis_choices.iter().cloned());
                }
            }
        }
        self.runs.push(StoredRun {
            protocol_id: protocol_id.to_string(),
            replicate_id,
            budget: run.shots_acquired(),
        });
    }

    fn record_mut(&mut self, protocol_id: &str, replicate_id: u64, setting_id: &str) -> &mut RawShotRecord {
        let position = self.records.iter().position(|r| {
            r.protocol_id == protocol_id && r.replicate_id == replicate_id && r.setting_id == setting_id
        });
        let index = match position {
            Some(index) => index,
            None => {
                self.records.push(RawShotRecord {
                    protocol_id: protocol_id.to_string(),
                    replicate_id,
                    setting_id: setting_id.to_string(),
                    bitstrings: Vec::new(),
                    measurement_bases: None,
                });
                self.records.len() - 1
            }
        };
        &mut self.records[index]
    }

    /// Records of one run, in insertion order.
    pub fn records(&self, protocol_id: &str, replicate_id: u64) -> Vec<&RawShotRecord> {
        self.records
            .iter()
            .filter(|r| r.protocol_id == protocol_id && r.replicate_id == replicate_id)
            .collect()
    }

    /// Record for one setting of one run.
    pub fn record(&self, protocol_id: &str, replicate_id: u64, setting_id: &str) -> Option<&RawShotRecord> {
        self.records.iter().find(|r| {
            r.protocol_id == protocol_id && r.replicate_id == replicate_id && r.setting_id == setting_id
        })
    }

    /// Shots acquired by a stored run.
    pub fn stored_budget(&self, protocol_id: &str, replicate_id: u64) -> Option<usize> {
        self.runs
            .iter()
            .find(|r| r.protocol_id == protocol_id && r.replicate_id == replicate_id)
            .map(|r| r.budget)
    }

    /// Stored runs in insertion order.
    pub fn runs(&self) -> &[StoredRun] {
        &self.runs
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the store as canonical JSON.
    pub fn save(&self, path: &Path) -> Result<(), QsbError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error("store-dir", err))?;
        }
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(path, bytes).map_err(|err| io_error("store-write", err))
    }

    /// Reads a store written by [`RawShotStore::save`].
    pub fn load(path: &Path) -> Result<Self, QsbError> {
        let bytes = fs::read(path).map_err(|err| {
            QsbError::Serde(
                ErrorInfo::new("store-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        from_json_slice(&bytes)
    }
}
