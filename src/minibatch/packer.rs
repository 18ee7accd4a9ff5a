//! Sequence-to-minibatch packing
//!
//! Takes the sequences chosen by the randomizer, together with their raw
//! sample data, and lays them out as packed per-stream buffers plus a
//! layout. Each sequence occupies its own parallel stream slot; the time
//! axis is the length of the longest sequence in the batch, and shorter
//! sequences are padded with `NO_INPUT` cells past their last sample.

use crate::deserializer::SequenceData;
use crate::error::FeedError;
use crate::minibatch::buffer::PackedBuffer;
use crate::minibatch::layout::{CellFlags, MbLayout};
use crate::minibatch::PackedBuffers;
use crate::timeline::{SequenceDescription, StreamDescription};
use crate::Result;

/// Pack sequences into per-stream buffers and a layout, in place
///
/// Buffers are created or resized to `sample_dimension` rows and
/// `sequences.len() * max_length` columns per stream. Returns the number
/// of real samples packed (the sum of sequence lengths). An empty batch
/// packs to a 0 x 0 layout and empty buffers.
pub fn pack_minibatch<T: Copy + Default>(
    streams: &[StreamDescription],
    sequences: &[(SequenceDescription, SequenceData<T>)],
    buffers: &mut PackedBuffers<T>,
    layout: &mut MbLayout,
) -> Result<usize> {
    let parallel_sequences = sequences.len();
    let time_steps = sequences
        .iter()
        .map(|(description, _)| description.length_in_samples)
        .max()
        .unwrap_or(0);

    layout.init(parallel_sequences, time_steps);
    for stream in streams {
        buffers
            .entry(stream.name.clone())
            .or_insert_with(|| PackedBuffer::new(0, 0))
            .resize(stream.sample_dimension, parallel_sequences * time_steps);
    }

    let mut packed_samples = 0;
    for (slot, (description, data)) in sequences.iter().enumerate() {
        let length = description.length_in_samples;
        if length == 0 {
            return Err(FeedError::invariant(format!(
                "sequence {} has zero length",
                description.global_id
            ))
            .into());
        }
        packed_samples += length;

        for stream in streams {
            let samples = data.get(&stream.name).ok_or_else(|| {
                FeedError::invariant(format!(
                    "sequence {} is missing data for stream '{}'",
                    description.global_id, stream.name
                ))
            })?;
            let dimension = stream.sample_dimension;
            if samples.len() != length * dimension {
                return Err(FeedError::invariant(format!(
                    "sequence {} stream '{}' holds {} elements, expected {} samples x {} dims",
                    description.global_id,
                    stream.name,
                    samples.len(),
                    length,
                    dimension
                ))
                .into());
            }

            let buffer = buffers.get_mut(&stream.name).ok_or_else(|| {
                FeedError::invariant(format!("no packed buffer for stream '{}'", stream.name))
            })?;
            for t in 0..length {
                buffer.set_column_slice(
                    &samples[t * dimension..(t + 1) * dimension],
                    t * parallel_sequences + slot,
                    1,
                )?;
            }
        }

        layout.add_flags(slot, 0, CellFlags::SEQUENCE_START);
        layout.add_flags(slot, length - 1, CellFlags::SEQUENCE_END);
        for t in length..time_steps {
            layout.set(slot, t, CellFlags::NO_INPUT);
        }
    }

    Ok(packed_samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::mock::InMemoryDeserializer;
    use crate::deserializer::Deserializer;

    fn sequence(global_id: u64, length: usize) -> SequenceDescription {
        SequenceDescription {
            global_id,
            chunk_id: 0,
            length_in_samples: length,
        }
    }

    fn data_for(
        deserializer: &InMemoryDeserializer,
        descriptions: &[SequenceDescription],
    ) -> Vec<(SequenceDescription, SequenceData<f32>)> {
        descriptions
            .iter()
            .map(|d| (*d, deserializer.sequence_data(d.global_id).unwrap()))
            .collect()
    }

    #[test]
    fn test_pack_uniform_batch() {
        let deserializer = InMemoryDeserializer::uniform(
            vec![StreamDescription {
                name: "features".to_string(),
                sample_dimension: 2,
            }],
            1,
            3,
            4,
        );
        let descriptions: Vec<_> = deserializer.sequence_timeline().to_vec();
        let batch = data_for(&deserializer, &descriptions);

        let mut buffers = PackedBuffers::new();
        let mut layout = MbLayout::new(0, 0);
        let samples =
            pack_minibatch(deserializer.stream_descriptions(), &batch, &mut buffers, &mut layout)
                .unwrap();

        assert_eq!(samples, 12);
        assert_eq!(layout.num_parallel_sequences(), 3);
        assert_eq!(layout.num_time_steps(), 4);
        assert_eq!(layout.num_valid_cells(), 12);
        let features = &buffers["features"];
        assert_eq!(features.row_count(), 2);
        assert_eq!(features.column_count(), 12);

        // Sequence in slot 1, time step 2 lands in column 2*3 + 1
        let expected = deserializer.sequence_data(1).unwrap();
        assert_eq!(
            features.column_slice(2 * 3 + 1, 1).unwrap(),
            &expected["features"][2 * 2..3 * 2]
        );
    }

    #[test]
    fn test_pack_flags_boundaries_and_padding() {
        let deserializer = InMemoryDeserializer::from_chunk_lengths(
            InMemoryDeserializer::single_stream(1),
            &[vec![3, 1]],
        );
        let batch = data_for(&deserializer, deserializer.sequence_timeline());

        let mut buffers = PackedBuffers::new();
        let mut layout = MbLayout::new(0, 0);
        let samples =
            pack_minibatch(deserializer.stream_descriptions(), &batch, &mut buffers, &mut layout)
                .unwrap();

        assert_eq!(samples, 4);
        assert_eq!(layout.num_time_steps(), 3);
        // Slot 0 spans all three steps
        assert!(layout.get(0, 0).contains(CellFlags::SEQUENCE_START));
        assert!(layout.get(0, 2).contains(CellFlags::SEQUENCE_END));
        assert!(layout.get(0, 1).is_valid());
        // Slot 1 is a one-sample sequence with a padded tail
        assert!(layout.get(1, 0).contains(CellFlags::SEQUENCE_START));
        assert!(layout.get(1, 0).contains(CellFlags::SEQUENCE_END));
        assert!(!layout.get(1, 1).is_valid());
        assert!(!layout.get(1, 2).is_valid());
        assert_eq!(layout.num_valid_cells(), 4);
    }

    #[test]
    fn test_pack_empty_batch() {
        let mut buffers: PackedBuffers<f32> = PackedBuffers::new();
        let mut layout = MbLayout::new(2, 2);
        let streams = InMemoryDeserializer::single_stream(3);
        let samples = pack_minibatch(&streams, &[], &mut buffers, &mut layout).unwrap();
        assert_eq!(samples, 0);
        assert_eq!(layout.column_count(), 0);
        assert_eq!(buffers["features"].column_count(), 0);
    }

    #[test]
    fn test_pack_rejects_short_data() {
        let streams = InMemoryDeserializer::single_stream(2);
        let mut data = SequenceData::new();
        data.insert("features".to_string(), vec![0.0; 3]);
        let batch = vec![(sequence(0, 2), data)];

        let mut buffers = PackedBuffers::new();
        let mut layout = MbLayout::new(0, 0);
        assert!(pack_minibatch(&streams, &batch, &mut buffers, &mut layout).is_err());
    }

    #[test]
    fn test_pack_rejects_missing_stream() {
        let streams = InMemoryDeserializer::single_stream(1);
        let batch = vec![(sequence(0, 1), SequenceData::<f32>::new())];
        let mut buffers = PackedBuffers::new();
        let mut layout = MbLayout::new(0, 0);
        assert!(pack_minibatch(&streams, &batch, &mut buffers, &mut layout).is_err());
    }
}
