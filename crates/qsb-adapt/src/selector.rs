use qsb_core::{ErrorInfo, QsbError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::posterior::{argmin_first, probability_best, ErrorPosterior};
use crate::source::ErrorSource;

fn default_n_mc() -> usize {
    2000
}

/// Adaptive selection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Shots each protocol receives per exploration step.
    pub batch_size: usize,
    /// Commit once some protocol's P(best) reaches this value.
    pub threshold: f64,
    /// Monte-Carlo draws per P(best) estimate.
    #[serde(default = "default_n_mc")]
    pub n_mc: usize,
    /// Shots for exploration and exploitation combined.
    pub total_budget: usize,
}

impl AdaptiveConfig {
    /// Same configuration at another threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Per-protocol step cap `total_budget / (K · batch_size)`.
    pub fn max_steps(&self, n_protocols: usize) -> usize {
        let per_step = n_protocols.saturating_mul(self.batch_size);
        if per_step == 0 {
            0
        } else {
            self.total_budget / per_step
        }
    }

    /// Fails fast on a zero batch, a threshold outside `(0, 1)`, zero draws
    /// or a budget too small for one step across `n_protocols`.
    pub fn validate(&self, n_protocols: usize) -> Result<(), QsbError> {
        if self.batch_size == 0 {
            return Err(QsbError::config("invalid-batch-size", "batch_size must be at least 1"));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(QsbError::Config(
                ErrorInfo::new("invalid-threshold", "threshold must lie in (0, 1)")
                    .with_context("threshold", self.threshold.to_string()),
            ));
        }
        if self.n_mc == 0 {
            return Err(QsbError::config("invalid-mc-draws", "n_mc must be at least 1"));
        }
        if n_protocols == 0 {
            return Err(QsbError::config("empty-candidates", "adaptive selection needs at least one protocol"));
        }
        if self.max_steps(n_protocols) == 0 {
            return Err(QsbError::Config(
                ErrorInfo::new("zero-max-steps", "budget cannot fund one exploration step")
                    .with_context("total_budget", self.total_budget.to_string())
                    .with_context("protocols", n_protocols.to_string())
                    .with_context("batch_size", self.batch_size.to_string())
                    .with_hint("raise total_budget or lower batch_size"),
            ));
        }
        Ok(())
    }
}

/// Selector phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SelectorPhase {
    /// Still spending `batch_size` shots per protocol per step.
    Exploring {
        /// Steps completed.
        step: usize,
    },
    /// Selection fixed.
    Committed {
        /// Selected protocol id.
        protocol: String,
        /// Step at which the commit happened.
        step: usize,
        /// Whether the step cap forced the commit.
        forced: bool,
    },
}

/// Beliefs at one exploration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// One-based step.
    pub step: usize,
    /// Shots per protocol at this step.
    pub shots_per_protocol: usize,
    /// Probability of being best, in candidate order.
    pub p_best: Vec<f64>,
}

/// Result of one adaptive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    /// Selected protocol id.
    pub selected: String,
    /// Commit step.
    pub commit_step: usize,
    /// Whether the step cap forced the commit.
    pub forced: bool,
    /// Shots spent exploring across every protocol.
    pub exploration_shots: usize,
    /// Shots the selected protocol holds after exploitation.
    pub final_shots: usize,
    /// Beliefs per step.
    pub history: Vec<StepRecord>,
}

/// Explore-then-commit selector over a fixed candidate list.
#[derive(Debug, Clone)]
pub struct AdaptiveSelector {
    config: AdaptiveConfig,
    candidates: Vec<String>,
    max_steps: usize,
    phase: SelectorPhase,
    history: Vec<StepRecord>,
}

impl AdaptiveSelector {
    /// Validates the configuration against the candidate count.
    pub fn new(config: AdaptiveConfig, candidates: Vec<String>) -> Result<Self, QsbError> {
        config.validate(candidates.len())?;
        let max_steps = config.max_steps(candidates.len());
        Ok(Self {
            config,
            candidates,
            max_steps,
            phase: SelectorPhase::Exploring { step: 0 },
            history: Vec::new(),
        })
    }

    /// Current phase.
    pub fn phase(&self) -> &SelectorPhase {
        &self.phase
    }

    /// Per-protocol step cap.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Runs one exploration step; a committed selector is left unchanged.
    ///
    /// A confident commit takes the P(best) leader. A commit forced by the
    /// step cap takes the lowest posterior location instead.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        source: &dyn ErrorSource,
        replicate_id: u64,
        rng: &mut R,
    ) -> Result<&SelectorPhase, QsbError> {
        let SelectorPhase::Exploring { step } = self.phase else {
            return Ok(&self.phase);
        };
        let step = step + 1;
        let shots = step * self.config.batch_size;
        let posteriors = self
            .candidates
            .iter()
            .map(|id| -> Result<ErrorPosterior, QsbError> {
                Ok(ErrorPosterior::from_errors(&source.errors(id, shots, replicate_id)?))
            })
            .collect::<Result<Vec<_>, QsbError>>()?;
        let p_best = probability_best(&posteriors, self.config.n_mc, rng)?;

        let (leader, leader_p) = p_best
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (index, p)| if p > best.1 { (index, p) } else { best });
        self.history.push(StepRecord {
            step,
            shots_per_protocol: shots,
            p_best,
        });

        let confident = leader_p >= self.config.threshold;
        if confident || step >= self.max_steps {
            // Forced commits ignore P(best) and take the lowest location.
            let chosen = if confident {
                leader
            } else {
                let locations: Vec<f64> = posteriors.iter().map(|p| p.location).collect();
                argmin_first(&locations).unwrap_or(leader)
            };
            let protocol = self.candidates[chosen].clone();
            debug!(
                protocol = %protocol,
                step,
                p_best = leader_p,
                forced = !confident,
                "adaptive selector committed"
            );
            self.phase = SelectorPhase::Committed {
                protocol,
                step,
                forced: !confident,
            };
        } else {
            self.phase = SelectorPhase::Exploring { step };
        }
        Ok(&self.phase)
    }

    /// Steps until committed and accounts the exploitation budget.
    pub fn run<R: Rng + ?Sized>(
        mut self,
        source: &dyn ErrorSource,
        replicate_id: u64,
        rng: &mut R,
    ) -> Result<SelectionOutcome, QsbError> {
        loop {
            let phase = self.step(source, replicate_id, rng)?.clone();
            if let SelectorPhase::Committed { protocol, step, forced } = phase {
                let exploration_shots = self.candidates.len() * step * self.config.batch_size;
                let remaining = self.config.total_budget - exploration_shots;
                return Ok(SelectionOutcome {
                    selected: protocol,
                    commit_step: step,
                    forced,
                    exploration_shots,
                    final_shots: step * self.config.batch_size + remaining,
                    history: self.history,
                });
            }
        }
    }
}
