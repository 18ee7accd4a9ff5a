//! Minibatch buffers, layout metadata, packing, and decimation
//!
//! A minibatch is a set of named column-major buffers (one per input
//! stream) plus an `MbLayout` describing which (parallel stream, time
//! step) cells hold real data. All buffers of one minibatch share the same
//! column count `parallel_sequences * time_steps`.
//!
//! # Modules
//!
//! - `buffer`: generic resizable 2-D buffer with column-slice operations
//! - `layout`: per-cell validity/boundary metadata
//! - `packer`: assembles served sequences into buffers + layout
//! - `decimator`: splits parallel streams across worker ranks in place

pub mod buffer;
pub mod decimator;
pub mod layout;
pub mod packer;

pub use buffer::PackedBuffer;
pub use decimator::decimate_minibatch;
pub use layout::{CellFlags, MbLayout};
pub use packer::pack_minibatch;

use std::collections::BTreeMap;

/// Named per-stream buffers of one minibatch
pub type PackedBuffers<T> = BTreeMap<String, PackedBuffer<T>>;
