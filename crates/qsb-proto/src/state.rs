use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_core::{ErrorInfo, QsbError};
use qsb_obs::ObservableSet;
use serde::{Deserialize, Serialize};

use crate::plan::{MeasurementSetting, SettingBasis};
use crate::sampler::parse_bitstring;

/// Outcomes of one acquisition round. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum RawDatasetChunk {
    /// Shot-ordered bitstrings per fixed-basis setting.
    Direct {
        /// `setting_id → bitstrings`.
        outcomes: BTreeMap<String, Vec<String>>,
    },
    /// Randomized-basis shots.
    Shadow {
        /// `outcomes[shot][qubit] ∈ {0, 1}`.
        outcomes: Vec<Vec<u8>>,
        /// `basis_choices[shot][qubit] ∈ {0 = Z, 1 = X, 2 = Y}`.
        basis_choices: Vec<Vec<u8>>,
    },
}

impl RawDatasetChunk {
    /// Number of shots carried by the chunk.
    pub fn n_shots(&self) -> usize {
        match self {
            RawDatasetChunk::Direct { outcomes } => outcomes.values().map(Vec::len).sum(),
            RawDatasetChunk::Shadow { outcomes, .. } => outcomes.len(),
        }
    }

    /// Shadow chunk from stored bitstrings and per-shot basis choices.
    pub fn shadow_from_bitstrings(
        bitstrings: &[String],
        basis_choices: Vec<Vec<u8>>,
        num_qubits: usize,
    ) -> Result<Self, QsbError> {
        let outcomes = bitstrings
            .iter()
            .map(|bits| parse_bitstring(bits, num_qubits))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RawDatasetChunk::Shadow {
            outcomes,
            basis_choices,
        })
    }

    fn validate(&self, layout: &[MeasurementSetting], num_qubits: usize) -> Result<(), QsbError> {
        match self {
            RawDatasetChunk::Direct { outcomes } => {
                for (setting_id, bitstrings) in outcomes {
                    let known = layout.iter().any(|setting| {
                        setting.setting_id == *setting_id
                            && matches!(setting.basis, SettingBasis::Fixed(_))
                    });
                    if !known {
                        return Err(QsbError::Data(
                            ErrorInfo::new("unknown-setting", "chunk names a setting outside the layout")
                                .with_context("setting", setting_id.clone()),
                        ));
                    }
                    for bitstring in bitstrings {
                        parse_bitstring(bitstring, num_qubits)?;
                    }
                }
                Ok(())
            }
            RawDatasetChunk::Shadow {
                outcomes,
                basis_choices,
            } => {
                if !layout
                    .iter()
                    .any(|setting| setting.basis == SettingBasis::Random)
                {
                    return Err(QsbError::Data(ErrorInfo::new(
                        "unexpected-chunk-family",
                        "shadow chunk offered to a layout without a random setting",
                    )));
                }
                let malformed = |shot: usize| {
                    QsbError::Data(
                        ErrorInfo::new("malformed-shadow-chunk", "shadow rows must match the register")
                            .with_context("shot", shot.to_string())
                            .with_context("num_qubits", num_qubits.to_string()),
                    )
                };
                if outcomes.len() != basis_choices.len() {
                    return Err(malformed(outcomes.len().min(basis_choices.len())));
                }
                for (shot, (bits, bases)) in outcomes.iter().zip(basis_choices).enumerate() {
                    let rows_fit = bits.len() == num_qubits && bases.len() == num_qubits;
                    let values_fit = bits.iter().all(|b| *b <= 1) && bases.iter().all(|b| *b <= 2);
                    if !rows_fit || !values_fit {
                        return Err(malformed(shot));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Accumulator owned by exactly one protocol run.
///
/// Moved into `update` and returned; never shared between runs.
#[derive(Debug, Clone)]
pub struct ProtocolState {
    observable_set: Arc<ObservableSet>,
    total_budget: usize,
    remaining_budget: usize,
    seed: u64,
    layout: Vec<MeasurementSetting>,
    chunks: Vec<RawDatasetChunk>,
    round_count: usize,
    converged: bool,
}

impl ProtocolState {
    /// Fresh state with the full budget remaining.
    pub fn new(
        observable_set: Arc<ObservableSet>,
        total_budget: usize,
        seed: u64,
        layout: Vec<MeasurementSetting>,
    ) -> Self {
        Self {
            observable_set,
            total_budget,
            remaining_budget: total_budget,
            seed,
            layout,
            chunks: Vec::new(),
            round_count: 0,
            converged: false,
        }
    }

    /// Shared observable set.
    pub fn observable_set(&self) -> &Arc<ObservableSet> {
        &self.observable_set
    }

    /// Budget at initialization.
    pub fn total_budget(&self) -> usize {
        self.total_budget
    }

    /// Budget not yet spent.
    pub fn remaining_budget(&self) -> usize {
        self.remaining_budget
    }

    /// Run seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Settings fixed at initialization.
    pub fn layout(&self) -> &[MeasurementSetting] {
        &self.layout
    }

    /// Accepted chunks in arrival order.
    pub fn chunks(&self) -> &[RawDatasetChunk] {
        &self.chunks
    }

    /// Number of accepted chunks.
    pub fn round_count(&self) -> usize {
        self.round_count
    }

    /// Whether the protocol asked the loop to stop.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Shots accepted so far.
    pub fn shots_acquired(&self) -> usize {
        self.total_budget - self.remaining_budget
    }

    /// Validates and appends a chunk, decrementing the remaining budget.
    pub fn absorb(mut self, chunk: RawDatasetChunk) -> Result<Self, QsbError> {
        let shots = chunk.n_shots();
        if shots > self.remaining_budget {
            return Err(QsbError::Data(
                ErrorInfo::new("budget-overspent", "chunk exceeds the remaining budget")
                    .with_context("shots", shots.to_string())
                    .with_context("remaining", self.remaining_budget.to_string()),
            ));
        }
        chunk.validate(&self.layout, self.observable_set.num_qubits())?;
        self.remaining_budget -= shots;
        self.round_count += 1;
        self.chunks.push(chunk);
        Ok(self)
    }

    /// Sets the convergence flag.
    pub fn with_converged(mut self, converged: bool) -> Self {
        self.converged = converged;
        self
    }

    /// All bitstrings recorded for `setting_id`, in arrival order.
    pub fn direct_outcomes(&self, setting_id: &str) -> Vec<&str> {
        self.chunks
            .iter()
            .filter_map(|chunk| match chunk {
                RawDatasetChunk::Direct { outcomes } => outcomes.get(setting_id),
                RawDatasetChunk::Shadow { .. } => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// All shadow rows as `(outcomes, basis_choices)`, in arrival order.
    pub fn shadow_rows(&self) -> (Vec<&[u8]>, Vec<&[u8]>) {
        let mut outcomes = Vec::new();
        let mut bases = Vec::new();
        for chunk in &self.chunks {
            if let RawDatasetChunk::Shadow {
                outcomes: rows,
                basis_choices,
            } = chunk
            {
                outcomes.extend(rows.iter().map(Vec::as_slice));
                bases.extend(basis_choices.iter().map(Vec::as_slice));
            }
        }
        (outcomes, bases)
    }
}
