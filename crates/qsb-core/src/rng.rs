//! Seeded RNG handle and the seed tree shared by every run.
//!
//! One master seed fans out into per-run, per-round and per-label seeds by
//! hashing with SipHash-1-3 under fixed zero keys, so a seed depends only on
//! the path that names it and never on scheduling order.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

const RUN_AXIS_SALT: u64 = 0xA5A5_A5A5_A5A5_A5A5;

fn seed_hasher(master_seed: u64) -> SipHasher13 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher
}

/// `StdRng` seeded from a `u64`; the only RNG type protocols and studies draw from.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Handle seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Handle for substream `index` of `master_seed`.
    pub fn substream(master_seed: u64, index: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, index))
    }

    /// Handle for the stream labelled `label` under `master_seed`.
    pub fn labelled(master_seed: u64, label: &str) -> Self {
        Self::from_seed(derive_labelled_seed(master_seed, label))
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed of substream `index` (acquisition round, basis pattern, setting).
pub fn derive_substream_seed(master_seed: u64, index: u64) -> u64 {
    let mut hasher = seed_hasher(master_seed);
    hasher.write_u64(index);
    hasher.finish()
}

/// Seed of a named stream, independent of registration order.
pub fn derive_labelled_seed(master_seed: u64, label: &str) -> u64 {
    let mut hasher = seed_hasher(master_seed);
    hasher.write(label.as_bytes());
    hasher.finish()
}

/// Seed of one independent run indexed by replicate and an outer axis such as
/// a budget or threshold index.
pub fn derive_run_seed(master_seed: u64, replicate_id: u64, axis_index: u64) -> u64 {
    let replicate_seed = derive_substream_seed(master_seed, replicate_id);
    derive_substream_seed(replicate_seed ^ RUN_AXIS_SALT, axis_index)
}
