#![deny(missing_docs)]
#![doc = "Persisted raw shots, prefix re-estimation and Bayesian explore-then-commit protocol selection."]

pub mod posterior;
/// Prefix replay of stored runs through a protocol.
pub mod reestimate;
/// Threshold sweeps against the full-budget oracle.
pub mod regret;
/// Adaptive selector state machine.
pub mod selector;
/// Error sources feeding the selector.
pub mod source;
pub mod store;

pub use posterior::{argmin_first, probability_best, ErrorPosterior, PosteriorSampler, EMPTY_LOCATION};
pub use reestimate::{prefix_chunk, reestimate_prefix};
pub use regret::{run_regret_study, RegretRecord, RegretStudy, ThresholdSummary};
pub use selector::{AdaptiveConfig, AdaptiveSelector, SelectionOutcome, SelectorPhase, StepRecord};
pub use source::{absolute_errors, ErrorSource, SubsampledErrorSource, TabulatedErrorSource};
pub use store::{prefix_len, RawShotRecord, RawShotStore, StoredRun};
