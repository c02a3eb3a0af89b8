#![deny(missing_docs)]
#![doc = "Core error, seeding and serialization types shared by every QSB crate."]

pub mod errors;
/// Stable hashing helpers.
pub mod hash;
pub mod provenance;
pub mod rng;
pub mod serde;

pub use errors::{ErrorInfo, QsbError};
pub use hash::stable_hash_string;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_labelled_seed, derive_run_seed, derive_substream_seed, RngHandle};
