//! Cross-rank minibatch decimation
//!
//! For parallel training without per-rank reading, every rank assembles
//! the same minibatch and then keeps only its own share of the parallel
//! streams. A packed input buffer is organized time-step-major:
//!
//! ```text
//!   | x_t^1  x_t^2 ... x_t^P |  ...  | x_{t+T-1}^1 ... x_{t+T-1}^P |
//!   |<----   block 1    ---->|  ...  |<------   block T     ------>|
//! ```
//!
//! Decimation splits each block so rank r keeps parallel streams
//! `[P*r/N, P*(r+1)/N)`. Floor division makes the ranges tile `[0, P)`
//! exactly even when P is not a multiple of N; the imbalance is reported
//! once as a warning, not an error. A rank may legitimately end up with
//! zero streams when there are more ranks than parallel streams (or at a
//! small epoch-tail minibatch); callers must tolerate a zero-sample
//! minibatch for that iteration.

use crate::error::FeedError;
use crate::minibatch::buffer::PackedBuffer;
use crate::minibatch::layout::MbLayout;
use crate::minibatch::PackedBuffers;
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};

static WARNED_UNEVEN_SPLIT: AtomicBool = AtomicBool::new(false);
static WARNED_ZERO_WIDTH: AtomicBool = AtomicBool::new(false);

/// Column range of parallel streams owned by one rank
///
/// Floor-division split: rank ranges need not be equal in size, but their
/// union over all ranks covers `[0, parallel_sequences)` with no overlap.
pub fn rank_stream_range(parallel_sequences: usize, rank: usize, num_ranks: usize) -> (usize, usize) {
    let start = parallel_sequences * rank / num_ranks;
    let end = parallel_sequences * (rank + 1) / num_ranks;
    (start, end)
}

/// Decimate a minibatch in place for one rank
///
/// Rewrites every named buffer and the layout to contain only this rank's
/// share of the parallel streams, preserving time alignment. No-op when
/// `num_ranks == 1`. Fatal if the buffers disagree on column count or the
/// layout does not match.
pub fn decimate_minibatch<T: Copy + Default>(
    buffers: &mut PackedBuffers<T>,
    layout: &mut MbLayout,
    rank: usize,
    num_ranks: usize,
) -> Result<()> {
    if num_ranks == 1 {
        return Ok(());
    }
    if rank >= num_ranks {
        return Err(FeedError::configuration(format!(
            "rank {} out of range for {} ranks",
            rank, num_ranks
        ))
        .into());
    }

    let parallel_sequences = layout.num_parallel_sequences();
    let time_steps = layout.num_time_steps();
    let expected_columns = layout.column_count();

    let (rank_start, rank_end) = rank_stream_range(parallel_sequences, rank, num_ranks);
    let new_parallel_sequences = rank_end - rank_start;

    if parallel_sequences % num_ranks != 0 && !WARNED_UNEVEN_SPLIT.swap(true, Ordering::Relaxed) {
        eprintln!(
            "Warning: decimate_minibatch: {} parallel sequences not a multiple of {} ranks, \
             rank shares will be uneven",
            parallel_sequences, num_ranks
        );
    }
    if new_parallel_sequences == 0 && !WARNED_ZERO_WIDTH.swap(true, Ordering::Relaxed) {
        eprintln!(
            "decimate_minibatch: rank {} receives zero of {} parallel sequences \
             (more ranks than streams); serving an empty share this iteration",
            rank, parallel_sequences
        );
    }

    // Decimate data
    for (name, buffer) in buffers.iter_mut() {
        if buffer.column_count() != expected_columns {
            return Err(FeedError::configuration(format!(
                "stream '{}' has {} columns, layout expects {} ({} streams x {} steps)",
                name,
                buffer.column_count(),
                expected_columns,
                parallel_sequences,
                time_steps
            ))
            .into());
        }

        let mut decimated = PackedBuffer::new(buffer.row_count(), new_parallel_sequences * time_steps);
        for t in 0..time_steps {
            let source = buffer.column_slice(t * parallel_sequences + rank_start, new_parallel_sequences)?;
            decimated.set_column_slice(source, t * new_parallel_sequences, new_parallel_sequences)?;
        }
        buffer.replace_with(decimated);
    }

    // Decimate layout, copying only the retained stream slots
    let mut decimated_layout = MbLayout::new(new_parallel_sequences, time_steps);
    for t in 0..time_steps {
        for s in 0..new_parallel_sequences {
            decimated_layout.set(s, t, layout.get(s + rank_start, t));
        }
    }
    layout.move_from(decimated_layout);

    Ok(())
}
