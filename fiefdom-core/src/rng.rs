//! Injectable randomness.
//!
//! Attrition rolls, transfer durations and troop estimates all draw through
//! [`RandomSource`] so tests can script exact outcomes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource {
    /// Uniform real in `[0, 100]`.
    fn percent(&mut self) -> f64;

    /// Uniform integer in `[lo, hi]`.
    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32;

    /// Uniform real in `[-1, 1]`.
    fn signed_unit(&mut self) -> f64;
}

/// Deterministic source for a given seed (replays bit-for-bit).
pub struct SeededRng {
    rng: StdRng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRng {
    fn percent(&mut self) -> f64 {
        self.rng.gen_range(0.0..=100.0)
    }

    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        self.rng.gen_range(lo..=hi)
    }

    fn signed_unit(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}
