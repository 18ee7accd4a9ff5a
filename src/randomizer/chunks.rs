//! Chunk permutation and randomization windows
//!
//! For one sweep, chunks are permuted with the sweep's RNG and laid back
//! onto a randomized timeline. Every randomized chunk position then gets a
//! window `[window_begin, window_end)` of neighboring positions it may
//! exchange sequence order with, sized so the cumulative sample span stays
//! within the configured randomization range. Half the budget is spent on
//! each side of the chunk.
//!
//! Windows are computed with two cursors that only move forward, so both
//! bounds are monotonically non-decreasing in chunk position. That sliding
//! property is what lets sequence randomization work on a contiguous chunk
//! range without ever looking outside it.

use crate::error::FeedError;
use crate::randomizer::rng::SweepRng;
use crate::timeline::{ChunkInformation, TimelineInfo};
use crate::Result;

/// A chunk's identity and placement after permutation
#[derive(Debug, Clone, Copy)]
pub struct RandomizedChunk {
    /// Index of this chunk in the original timeline; `usize::MAX` marks
    /// the sentinel entry
    pub original_chunk_index: usize,
    /// Prefix offsets on the randomized timeline
    pub info: ChunkInformation,
    /// First randomized chunk position this chunk may trade sequences with
    pub window_begin: usize,
    /// One past the last such position
    pub window_end: usize,
}

/// Result of one sweep's chunk randomization
#[derive(Debug, Clone)]
pub struct ChunkRandomization {
    /// Randomized chunks in timeline order, with a sentinel appended
    pub chunks: Vec<RandomizedChunk>,
    /// Randomized sequence position -> randomized chunk index
    pub sequence_position_to_chunk_index: Vec<usize>,
}

impl ChunkRandomization {
    /// Number of real (non-sentinel) chunks
    pub fn num_chunks(&self) -> usize {
        self.chunks.len() - 1
    }

    /// Randomized chunk that owns the given randomized sequence position
    pub fn chunk_for_position(&self, sequence_position: usize) -> &RandomizedChunk {
        &self.chunks[self.sequence_position_to_chunk_index[sequence_position]]
    }
}

/// Permute chunks for one sweep and compute their randomization windows
///
/// Fails with a configuration error if `randomization_range_in_samples`
/// cannot contain the largest single chunk; no window could hold even one
/// chunk in that case.
pub fn randomize_chunks(
    info: &TimelineInfo,
    randomization_range_in_samples: usize,
    rng: &mut SweepRng,
) -> Result<ChunkRandomization> {
    let largest = info.max_chunk_samples();
    if largest > randomization_range_in_samples {
        return Err(FeedError::configuration(format!(
            "randomization range ({} samples) is smaller than the largest chunk ({} samples)",
            randomization_range_in_samples, largest
        ))
        .into());
    }

    let num_chunks = info.num_chunks;

    // Permute chunk indices with the sweep's generator
    let mut randomized_chunk_indices: Vec<usize> = (0..num_chunks).collect();
    rng.shuffle(&mut randomized_chunk_indices);

    // Place randomized chunks back onto a global timeline
    let mut chunks = Vec::with_capacity(num_chunks + 1);
    let mut sequence_position = 0usize;
    let mut sample_position = 0usize;
    for &original_chunk_index in &randomized_chunk_indices {
        chunks.push(RandomizedChunk {
            original_chunk_index,
            info: ChunkInformation {
                sequence_position_start: sequence_position,
                sample_position_start: sample_position,
            },
            window_begin: 0,
            window_end: 0,
        });
        sequence_position += info.sequences_in_chunk(original_chunk_index);
        sample_position += info.samples_in_chunk(original_chunk_index);
    }

    // Sentinel marks the end of the randomized timeline
    chunks.push(RandomizedChunk {
        original_chunk_index: usize::MAX,
        info: ChunkInformation {
            sequence_position_start: sequence_position,
            sample_position_start: sample_position,
        },
        window_begin: num_chunks,
        window_end: num_chunks,
    });

    // Grow each chunk's window with half the sample budget per side. The
    // cursors start from the left neighbor's window, so bounds never move
    // backwards as the chunk position increases.
    let half_window = randomization_range_in_samples / 2;
    for chunk_id in 0..num_chunks {
        let own_start = chunks[chunk_id].info.sample_position_start;

        let (mut window_begin, mut window_end) = if chunk_id == 0 {
            (0, 1)
        } else {
            (chunks[chunk_id - 1].window_begin, chunks[chunk_id - 1].window_end)
        };

        // A chunk always belongs to its own window
        window_end = window_end.max(chunk_id + 1);

        while own_start - chunks[window_begin].info.sample_position_start > half_window {
            window_begin += 1;
        }
        while window_end < num_chunks
            && chunks[window_end + 1].info.sample_position_start - own_start < half_window
        {
            window_end += 1;
        }
        // A chunk larger than half the budget can push the forced window
        // past the full range; left neighbors are given up first.
        while chunks[window_end].info.sample_position_start
            - chunks[window_begin].info.sample_position_start
            > randomization_range_in_samples
        {
            window_begin += 1;
        }

        chunks[chunk_id].window_begin = window_begin;
        chunks[chunk_id].window_end = window_end;
    }

    // Sequence position -> randomized chunk index lookup
    let mut sequence_position_to_chunk_index = Vec::with_capacity(info.num_sequences);
    for (chunk_index, chunk) in chunks[..num_chunks].iter().enumerate() {
        let count = info.sequences_in_chunk(chunk.original_chunk_index);
        sequence_position_to_chunk_index.extend(std::iter::repeat(chunk_index).take(count));
    }

    Ok(ChunkRandomization {
        chunks,
        sequence_position_to_chunk_index,
    })
}
