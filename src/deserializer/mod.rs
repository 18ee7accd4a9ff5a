//! Storage deserializer abstraction
//!
//! The randomizer never touches storage directly. It consumes a narrow
//! pull contract: enumerate the sequence timeline once, then fetch raw
//! sample data per sequence on demand. Implementations own the storage
//! format; this crate owns the order in which sequences are served.
//!
//! # Thread Safety
//!
//! A deserializer is owned by a single rank and read from one thread; no
//! `Sync` bound is required.

pub mod mock;

use crate::timeline::{SequenceDescription, StreamDescription};
use crate::Result;
use std::collections::BTreeMap;

/// Raw sample data for one sequence, keyed by stream name
///
/// Each stream's vector holds `length_in_samples * sample_dimension`
/// elements in sample-major order.
pub type SequenceData<T> = BTreeMap<String, Vec<T>>;

/// Pull contract for the underlying storage format
pub trait Deserializer {
    /// Buffer element type served by this deserializer
    type Elem: Copy + Default;

    /// Metadata for every named input stream
    fn stream_descriptions(&self) -> &[StreamDescription];

    /// The full ordered sequence timeline with chunk ids
    ///
    /// Chunk ids must be zero-based and dense: the first sequence carries
    /// chunk 0, and along the timeline a chunk id may only repeat or
    /// increment by one. The randomizer's per-chunk prefix table is
    /// indexed by chunk id, so a sparse numbering is rejected up front
    /// rather than mapped.
    fn sequence_timeline(&self) -> &[SequenceDescription];

    /// Raw samples for all streams of one sequence
    fn sequence_data(&self, global_id: u64) -> Result<SequenceData<Self::Elem>>;
}
