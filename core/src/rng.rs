//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! Every sampling function takes a `UniformSource` explicitly, and
//! every concrete source is a `SimRng` derived from a master seed.
//!
//! Each execution context (live preview, background worker,
//! sensitivity sweep, fallback) gets its own stream, seeded from
//! (master_seed, slot, generation). This means:
//!   - A background worker never shares generator state with the caller.
//!   - Re-running a generation with the same seed is bit-reproducible.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A stream of uniform draws in [0.0, 1.0).
pub trait UniformSource {
    fn next_f64(&mut self) -> f64;
}

/// A named, deterministic RNG stream.
pub struct SimRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }
}

impl UniformSource for SimRng {
    fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Derives every stream used by one scheduler from a single master seed.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Seed for `slot` at `generation`. Exposed so a worker thread can
    /// build its own `SimRng` on its side of the channel.
    pub fn seed_for(&self, slot: StreamSlot, generation: u64) -> u64 {
        let slot_mix = (slot as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        let gen_mix = generation.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        self.master_seed ^ slot_mix ^ gen_mix
    }

    pub fn stream(&self, slot: StreamSlot, generation: u64) -> SimRng {
        SimRng::from_seed(self.seed_for(slot, generation)).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder, only append. Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Live = 0,
    Worker = 1,
    Sensitivity = 2,
    Fallback = 3,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Worker => "worker",
            Self::Sensitivity => "sensitivity",
            Self::Fallback => "fallback",
        }
    }
}
