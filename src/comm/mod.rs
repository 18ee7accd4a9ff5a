//! Collective communication seam
//!
//! The feeder needs exactly one collective: an all-reduce sum of small
//! integer vectors, used to agree across ranks on whether any rank still
//! has data. The transport behind it (MPI, NCCL, sockets) lives outside
//! this crate; implementations plug in through the `Communicator` trait.
//!
//! # Modules
//!
//! - `local`: in-process communicator over crossbeam channels, for tests
//!   and single-machine multi-threaded training

pub mod local;

pub use local::ThreadGroupCommunicator;

use crate::Result;

/// Collective operations over a fixed group of ranks
///
/// Every rank in the group must call each collective the same number of
/// times in the same order.
pub trait Communicator {
    /// This rank's index in `[0, num_ranks)`
    fn rank(&self) -> usize;

    /// Total number of ranks in the group
    fn num_ranks(&self) -> usize;

    /// Element-wise sum of `values` across all ranks, in place
    ///
    /// On return every rank holds the same summed vector. All ranks must
    /// pass slices of the same length.
    fn all_reduce_sum(&self, values: &mut [i64]) -> Result<()>;
}

/// Trivial communicator for single-rank runs
///
/// Every collective is a local no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloCommunicator;

impl Communicator for SoloCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _values: &mut [i64]) -> Result<()> {
        Ok(())
    }
}
