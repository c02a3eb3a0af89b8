use std::sync::Arc;

use qsb_core::{derive_substream_seed, ErrorInfo, QsbError};
use qsb_obs::ObservableSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::estimate::ObservableEstimate;
use crate::protocol::Protocol;
use crate::sampler::{CircuitSpec, Sampler};
use crate::state::ProtocolState;

/// Shape of one `plan → acquire → update` round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDiagnostics {
    /// Zero-based round index.
    pub round: usize,
    /// Settings in the plan.
    pub settings: usize,
    /// Shots planned and acquired.
    pub shots: usize,
    /// Budget left after the round.
    pub remaining_after: usize,
}

/// Result of driving one protocol to completion.
#[derive(Debug, Clone)]
pub struct ProtocolRun {
    /// Protocol id.
    pub protocol_id: String,
    /// Final state, including every raw chunk.
    pub state: ProtocolState,
    /// One estimate per observable, in set order.
    pub estimates: Vec<ObservableEstimate>,
    /// Per-round diagnostics.
    pub rounds: Vec<RoundDiagnostics>,
}

impl ProtocolRun {
    /// Shots actually acquired.
    pub fn shots_acquired(&self) -> usize {
        self.state.shots_acquired()
    }
}

/// Drives `protocol` through its rounds and finalizes once.
///
/// Round `r` acquires with `derive_substream_seed(seed, r)`.
pub fn run_protocol(
    protocol: &dyn Protocol,
    set: Arc<ObservableSet>,
    circuit: &CircuitSpec,
    sampler: &dyn Sampler,
    budget: usize,
    seed: u64,
) -> Result<ProtocolRun, QsbError> {
    if circuit.num_qubits != set.num_qubits() {
        return Err(QsbError::Config(
            ErrorInfo::new("circuit-qubit-mismatch", "circuit and observables disagree on register size")
                .with_context("circuit", circuit.num_qubits.to_string())
                .with_context("observables", set.num_qubits().to_string()),
        ));
    }
    let mut state = protocol.initialize(Arc::clone(&set), budget, seed)?;
    let mut rounds = Vec::new();
    while state.remaining_budget() > 0 && !state.converged() {
        let plan = protocol.plan(&state)?;
        if plan.is_empty() {
            break;
        }
        if plan.total_shots() > state.remaining_budget() {
            return Err(QsbError::Data(
                ErrorInfo::new("plan-exceeds-budget", "plan asks for more shots than remain")
                    .with_context("protocol", protocol.id())
                    .with_context("planned", plan.total_shots().to_string())
                    .with_context("remaining", state.remaining_budget().to_string()),
            ));
        }
        let round = state.round_count();
        let round_seed = derive_substream_seed(seed, round as u64);
        let chunk = protocol.acquire(circuit, &plan, sampler, round_seed)?;
        state = protocol.update(state, chunk)?;
        debug!(
            protocol = protocol.id(),
            round,
            settings = plan.len(),
            shots = plan.total_shots(),
            remaining = state.remaining_budget(),
            "protocol round complete"
        );
        rounds.push(RoundDiagnostics {
            round,
            settings: plan.len(),
            shots: plan.total_shots(),
            remaining_after: state.remaining_budget(),
        });
    }
    let estimates = protocol.finalize(&state, &set)?;
    Ok(ProtocolRun {
        protocol_id: protocol.id().to_string(),
        state,
        estimates,
        rounds,
    })
}
