//! SweepFeed - Deterministic minibatch staging for data-parallel training
//!
//! SweepFeed feeds a training loop with shuffled, sharded minibatches of
//! variable-length sequences. It randomizes a dataset's sequence timeline
//! chunk by chunk under a bounded memory window, and decimates assembled
//! minibatches across worker ranks so each rank computes on a disjoint
//! slice of the same minibatch.
//!
//! # Architecture
//!
//! - **Timeline**: sequence/chunk metadata and well-formedness validation
//! - **Randomizer**: sweep-seeded chunk permutation with sliding sample
//!   windows, plus in-place sequence randomization within those windows
//! - **Minibatch**: packed column-major buffers, per-cell layout metadata,
//!   packing and cross-rank decimation
//! - **Feeder**: one-call-per-iteration orchestration with cross-rank
//!   end-of-epoch agreement
//! - **Comm**: injectable collective-communication context (no global
//!   singleton), with an in-process implementation for tests
//!
//! # Example
//!
//! ```
//! use sweepfeed::deserializer::mock::InMemoryDeserializer;
//! use sweepfeed::{BlockRandomizer, EpochConfig, ReaderConfig};
//!
//! # fn main() -> sweepfeed::Result<()> {
//! let dataset = InMemoryDeserializer::uniform(
//!     InMemoryDeserializer::single_stream(3),
//!     4, // chunks
//!     8, // sequences per chunk
//!     5, // samples per sequence
//! );
//!
//! let mut randomizer = BlockRandomizer::new(dataset, ReaderConfig::default())?;
//! randomizer.start_epoch(&EpochConfig::single_worker())?;
//!
//! // Batches come back shuffled, bounded by the requested sample count
//! let batch = randomizer.next_sequences(40)?;
//! assert!(!batch.is_empty());
//! assert!(batch.iter().map(|s| s.length_in_samples).sum::<usize>() <= 40);
//! # Ok(())
//! # }
//! ```

pub mod comm;
pub mod config;
pub mod deserializer;
pub mod error;
pub mod feeder;
pub mod minibatch;
pub mod randomizer;
pub mod timeline;

// Re-export commonly used types
pub use comm::Communicator;
pub use config::{DistributionMode, EpochConfig, RandomizationMode, ReaderConfig};
pub use error::FeedError;
pub use feeder::{FeedOutcome, MinibatchSource, Network, NetworkFeeder, RandomizedMinibatchSource};
pub use randomizer::block::BlockRandomizer;

/// Result type used throughout SweepFeed
pub type Result<T> = anyhow::Result<T>;
