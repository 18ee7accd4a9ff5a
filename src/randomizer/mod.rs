//! Chunk-aware sequence randomization
//!
//! Shuffling a dataset too large for memory cannot touch all sequences at
//! once. SweepFeed randomizes in two coupled steps, rebuilt once per sweep
//! (one full pass over the dataset):
//!
//! 1. **Chunk randomization**: permute the storage chunks with a
//!    sweep-seeded RNG and give every randomized chunk position a sliding
//!    window of neighboring positions whose cumulative sample count stays
//!    within the configured randomization range.
//! 2. **Sequence randomization**: shuffle individual sequences in place,
//!    constrained so a sequence never leaves the window of its chunk. The
//!    result is a true permutation of the sweep.
//!
//! Both steps are deterministic: the same seed, timeline, and range
//! reproduce the same order for any sweep index, across process restarts.
//!
//! # Modules
//!
//! - `rng`: sweep-seeded RNG strategies (windowed xoshiro, legacy LCG)
//! - `chunks`: chunk permutation and window computation
//! - `block`: sweep state, sequence randomization, and batch serving

pub mod block;
pub mod chunks;
pub mod rng;

pub use block::BlockRandomizer;
pub use chunks::{ChunkRandomization, RandomizedChunk};
pub use rng::SweepRng;
