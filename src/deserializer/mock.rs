//! In-memory deserializer for testing
//!
//! Serves a synthetic dataset without touching storage, making tests fast
//! and deterministic. Sample values encode the owning sequence's global id
//! so tests can verify that data and descriptions stay aligned through
//! randomization and packing.

use super::{Deserializer, SequenceData};
use crate::error::FeedError;
use crate::timeline::{SequenceDescription, StreamDescription};
use crate::Result;

/// Deserializer over a synthetic in-memory timeline
pub struct InMemoryDeserializer {
    streams: Vec<StreamDescription>,
    timeline: Vec<SequenceDescription>,
}

impl InMemoryDeserializer {
    /// Build a dataset from explicit per-chunk sequence lengths
    ///
    /// `chunk_lengths[c]` lists the sample lengths of the sequences in
    /// chunk `c`. Global ids are assigned in timeline order starting at 0.
    pub fn from_chunk_lengths(streams: Vec<StreamDescription>, chunk_lengths: &[Vec<usize>]) -> Self {
        let mut timeline = Vec::new();
        let mut global_id = 0u64;
        for (chunk_id, lengths) in chunk_lengths.iter().enumerate() {
            for &length_in_samples in lengths {
                timeline.push(SequenceDescription {
                    global_id,
                    chunk_id,
                    length_in_samples,
                });
                global_id += 1;
            }
        }
        Self { streams, timeline }
    }

    /// Build a uniform dataset: `num_chunks` chunks of `sequences_per_chunk`
    /// sequences, each `samples_per_sequence` samples long
    pub fn uniform(
        streams: Vec<StreamDescription>,
        num_chunks: usize,
        sequences_per_chunk: usize,
        samples_per_sequence: usize,
    ) -> Self {
        let chunk_lengths: Vec<Vec<usize>> = (0..num_chunks)
            .map(|_| vec![samples_per_sequence; sequences_per_chunk])
            .collect();
        Self::from_chunk_lengths(streams, &chunk_lengths)
    }

    /// Single stream named "features" with the given sample dimension
    pub fn single_stream(dimension: usize) -> Vec<StreamDescription> {
        vec![StreamDescription {
            name: "features".to_string(),
            sample_dimension: dimension,
        }]
    }
}

impl Deserializer for InMemoryDeserializer {
    type Elem = f32;

    fn stream_descriptions(&self) -> &[StreamDescription] {
        &self.streams
    }

    fn sequence_timeline(&self) -> &[SequenceDescription] {
        &self.timeline
    }

    fn sequence_data(&self, global_id: u64) -> Result<SequenceData<f32>> {
        let sequence = self
            .timeline
            .iter()
            .find(|s| s.global_id == global_id)
            .ok_or_else(|| {
                FeedError::invariant(format!("unknown sequence id {} requested", global_id))
            })?;

        let mut data = SequenceData::new();
        for stream in &self.streams {
            let count = sequence.length_in_samples * stream.sample_dimension;
            // Value encodes (id, sample offset) so misalignment is visible
            let values = (0..count)
                .map(|i| global_id as f32 * 1000.0 + i as f32)
                .collect();
            data.insert(stream.name.clone(), values);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::validate_timeline;

    #[test]
    fn test_uniform_dataset_shape() {
        let ds = InMemoryDeserializer::uniform(InMemoryDeserializer::single_stream(2), 3, 4, 5);
        assert_eq!(ds.sequence_timeline().len(), 12);
        assert!(validate_timeline(ds.sequence_timeline()).is_ok());
        assert_eq!(ds.stream_descriptions()[0].sample_dimension, 2);
    }

    #[test]
    fn test_sequence_data_dimensions() {
        let ds = InMemoryDeserializer::uniform(InMemoryDeserializer::single_stream(3), 1, 2, 4);
        let data = ds.sequence_data(1).unwrap();
        assert_eq!(data["features"].len(), 4 * 3);
        assert_eq!(data["features"][0], 1000.0);
    }

    #[test]
    fn test_unknown_id_is_error() {
        let ds = InMemoryDeserializer::uniform(InMemoryDeserializer::single_stream(1), 1, 1, 1);
        assert!(ds.sequence_data(99).is_err());
    }
}
