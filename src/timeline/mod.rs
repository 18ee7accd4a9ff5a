//! Sequence timeline metadata and validation
//!
//! The deserializer enumerates the dataset as an ordered timeline of
//! sequence descriptions grouped into chunks (contiguous, independently
//! loadable units of storage). This module holds the timeline data model
//! and the well-formedness checks that gate randomization: a malformed
//! timeline is rejected outright, never repaired.

use crate::error::FeedError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Description of one sequence in the dataset timeline
///
/// Identity is `global_id`, which must be unique and strictly increasing in
/// timeline order. `chunk_id` groups neighboring sequences into loadable
/// units and must be zero-based, dense, and non-decreasing along the
/// timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDescription {
    /// Globally unique sequence id
    pub global_id: u64,
    /// Storage chunk this sequence belongs to
    pub chunk_id: usize,
    /// Sequence length; must be > 0
    pub length_in_samples: usize,
}

/// Metadata for one named input stream served by the deserializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescription {
    /// Stream name, used as the buffer key in a minibatch
    pub name: String,
    /// Elements per sample (row count of the packed buffer)
    pub sample_dimension: usize,
}

/// Prefix offsets of one chunk into the global timeline
///
/// An array of these, with one sentinel entry appended past the last chunk,
/// supports O(log n) range lookups by binary search and O(1) per-chunk
/// sequence/sample counts by subtracting adjacent entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInformation {
    /// Timeline position of the chunk's first sequence
    pub sequence_position_start: usize,
    /// Global sample position of the chunk's first sample
    pub sample_position_start: usize,
}

/// Aggregate counts plus per-chunk prefix offsets for a validated timeline
#[derive(Debug, Clone)]
pub struct TimelineInfo {
    pub num_sequences: usize,
    pub num_chunks: usize,
    pub num_samples: usize,
    /// Per-chunk prefix offsets, with a sentinel entry appended
    pub chunk_information: Vec<ChunkInformation>,
}

impl TimelineInfo {
    /// Validate a timeline and compute its chunk prefix table
    ///
    /// Rejects (does not repair) a timeline containing a zero-length
    /// sequence, non-monotonic global ids, or a decreasing chunk id.
    pub fn from_timeline(timeline: &[SequenceDescription]) -> Result<Self> {
        validate_timeline(timeline)?;

        let mut chunk_information = Vec::new();
        let mut num_samples = 0usize;

        for (position, sequence) in timeline.iter().enumerate() {
            if sequence.chunk_id >= chunk_information.len() {
                // First sequence of a new chunk. Chunk ids are dense in
                // practice; a skipped id would get an empty entry, which
                // the validator has already ruled out.
                chunk_information.push(ChunkInformation {
                    sequence_position_start: position,
                    sample_position_start: num_samples,
                });
            }
            num_samples += sequence.length_in_samples;
        }

        let num_chunks = chunk_information.len();

        // Sentinel marks one past the end of the last chunk
        chunk_information.push(ChunkInformation {
            sequence_position_start: timeline.len(),
            sample_position_start: num_samples,
        });

        Ok(Self {
            num_sequences: timeline.len(),
            num_chunks,
            num_samples,
            chunk_information,
        })
    }

    /// Number of sequences in the given chunk
    pub fn sequences_in_chunk(&self, chunk_id: usize) -> usize {
        self.chunk_information[chunk_id + 1].sequence_position_start
            - self.chunk_information[chunk_id].sequence_position_start
    }

    /// Number of samples in the given chunk
    pub fn samples_in_chunk(&self, chunk_id: usize) -> usize {
        self.chunk_information[chunk_id + 1].sample_position_start
            - self.chunk_information[chunk_id].sample_position_start
    }

    /// Sample count of the largest single chunk
    pub fn max_chunk_samples(&self) -> usize {
        (0..self.num_chunks)
            .map(|chunk_id| self.samples_in_chunk(chunk_id))
            .max()
            .unwrap_or(0)
    }
}

/// Check that a timeline has only sequences of non-zero length with
/// strictly increasing ids and dense, non-decreasing chunk identifiers
/// (starting at 0, each id repeats or increments by one)
pub fn validate_timeline(timeline: &[SequenceDescription]) -> Result<()> {
    let mut previous: Option<&SequenceDescription> = None;

    for (position, sequence) in timeline.iter().enumerate() {
        if sequence.length_in_samples == 0 {
            return Err(FeedError::invariant(format!(
                "timeline position {}: sequence {} has zero length",
                position, sequence.global_id
            ))
            .into());
        }

        if let Some(prev) = previous {
            if sequence.global_id <= prev.global_id {
                return Err(FeedError::invariant(format!(
                    "timeline position {}: global id {} not strictly increasing (previous {})",
                    position, sequence.global_id, prev.global_id
                ))
                .into());
            }
            if sequence.chunk_id < prev.chunk_id {
                return Err(FeedError::invariant(format!(
                    "timeline position {}: chunk id {} decreases (previous {})",
                    position, sequence.chunk_id, prev.chunk_id
                ))
                .into());
            }
            if sequence.chunk_id > prev.chunk_id + 1 {
                return Err(FeedError::invariant(format!(
                    "timeline position {}: chunk id jumps from {} to {} (chunks must be dense)",
                    position, prev.chunk_id, sequence.chunk_id
                ))
                .into());
            }
        } else if sequence.chunk_id != 0 {
            return Err(FeedError::invariant(format!(
                "timeline must start at chunk 0, found chunk {}",
                sequence.chunk_id
            ))
            .into());
        }

        previous = Some(sequence);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(global_id: u64, chunk_id: usize, length: usize) -> SequenceDescription {
        SequenceDescription {
            global_id,
            chunk_id,
            length_in_samples: length,
        }
    }

    #[test]
    fn test_validate_timeline_accepts_well_formed() {
        let timeline = vec![
            sequence(0, 0, 3),
            sequence(1, 0, 1),
            sequence(2, 1, 2),
            sequence(5, 1, 4),
            sequence(9, 2, 1),
        ];
        assert!(validate_timeline(&timeline).is_ok());
    }

    #[test]
    fn test_validate_timeline_accepts_empty() {
        assert!(validate_timeline(&[]).is_ok());
    }

    #[test]
    fn test_validate_timeline_rejects_zero_length() {
        let timeline = vec![sequence(0, 0, 1), sequence(1, 0, 0)];
        assert!(validate_timeline(&timeline).is_err());
    }

    #[test]
    fn test_validate_timeline_rejects_duplicate_ids() {
        let timeline = vec![sequence(0, 0, 1), sequence(0, 0, 1)];
        assert!(validate_timeline(&timeline).is_err());
    }

    #[test]
    fn test_validate_timeline_rejects_decreasing_ids() {
        let timeline = vec![sequence(5, 0, 1), sequence(3, 0, 1)];
        assert!(validate_timeline(&timeline).is_err());
    }

    #[test]
    fn test_validate_timeline_rejects_decreasing_chunks() {
        let timeline = vec![sequence(0, 0, 1), sequence(1, 1, 1), sequence(2, 0, 1)];
        assert!(validate_timeline(&timeline).is_err());
    }

    #[test]
    fn test_validate_timeline_rejects_sparse_chunks() {
        let timeline = vec![sequence(0, 0, 1), sequence(1, 2, 1)];
        assert!(validate_timeline(&timeline).is_err());
    }

    #[test]
    fn test_timeline_info_prefix_offsets() {
        let timeline = vec![
            sequence(0, 0, 3),
            sequence(1, 0, 1),
            sequence(2, 1, 2),
            sequence(3, 2, 4),
        ];
        let info = TimelineInfo::from_timeline(&timeline).unwrap();

        assert_eq!(info.num_sequences, 4);
        assert_eq!(info.num_chunks, 3);
        assert_eq!(info.num_samples, 10);

        assert_eq!(info.sequences_in_chunk(0), 2);
        assert_eq!(info.sequences_in_chunk(1), 1);
        assert_eq!(info.samples_in_chunk(0), 4);
        assert_eq!(info.samples_in_chunk(2), 4);
        assert_eq!(info.max_chunk_samples(), 4);

        // Sentinel closes the last chunk
        assert_eq!(info.chunk_information.len(), 4);
        assert_eq!(info.chunk_information[3].sequence_position_start, 4);
        assert_eq!(info.chunk_information[3].sample_position_start, 10);
    }

}
