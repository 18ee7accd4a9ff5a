//! Sweep-seeded random number generation
//!
//! Every sweep derives a fresh generator from `base_seed + sweep_index`,
//! so sweep k is deterministic and distinct from sweep k+1, and a
//! restarted process replays the exact same order.
//!
//! Two strategies exist, selected once at construction:
//!
//! - **Windowed**: Xoshiro256++, the fast non-crypto RNG used everywhere
//!   else in this codebase.
//! - **Legacy**: the historical libc-style LCG shuffle, kept so orders
//!   recorded by older readers can be reproduced bit for bit.

use crate::config::RandomizationMode;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Historical libc-style linear congruential generator
///
/// Replays the `state * 214013 + 2531011` recurrence with 15-bit outputs.
/// Two outputs are combined per draw so ranges beyond 32768 stay reachable.
#[derive(Debug, Clone)]
pub struct LegacyRand {
    state: u32,
}

impl LegacyRand {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next15(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(214013).wrapping_add(2531011);
        (self.state >> 16) & 0x7fff
    }

    /// Next pseudo-random value in [0, 2^30)
    pub fn next(&mut self) -> u32 {
        (self.next15() << 15) | self.next15()
    }
}

/// Per-sweep RNG behind the randomization-mode strategy
pub enum SweepRng {
    Windowed(Xoshiro256PlusPlus),
    Legacy(LegacyRand),
}

impl SweepRng {
    /// Derive the generator for one sweep
    pub fn for_sweep(mode: RandomizationMode, base_seed: u64, sweep: u64) -> Self {
        let seed = base_seed.wrapping_add(sweep);
        match mode {
            RandomizationMode::Windowed => {
                SweepRng::Windowed(Xoshiro256PlusPlus::seed_from_u64(seed))
            }
            RandomizationMode::Legacy => SweepRng::Legacy(LegacyRand::new(seed as u32)),
        }
    }

    /// Uniform draw from [begin, end); `begin < end` required
    pub fn next_range(&mut self, begin: usize, end: usize) -> usize {
        debug_assert!(begin < end);
        match self {
            SweepRng::Windowed(rng) => rng.gen_range(begin..end),
            SweepRng::Legacy(rng) => begin + (rng.next() as usize) % (end - begin),
        }
    }

    /// Shuffle a slice in place
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        if values.len() < 2 {
            return;
        }
        match self {
            SweepRng::Windowed(rng) => values.shuffle(rng),
            SweepRng::Legacy(rng) => {
                // Historical swap loop, biases and all, for compatibility
                let n = values.len();
                for i in 0..n {
                    let j = (rng.next() as usize) % n;
                    values.swap(i, j);
                }
            }
        }
    }
}
