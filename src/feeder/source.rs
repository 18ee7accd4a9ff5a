//! Randomizing minibatch source
//!
//! Glues the block randomizer to the packer: asks the randomizer for the
//! next batch of sequence descriptions, pulls their raw data through the
//! deserializer, and packs everything into per-stream buffers plus a
//! layout.

use crate::config::{EpochConfig, ReaderConfig};
use crate::deserializer::{Deserializer, SequenceData};
use crate::feeder::MinibatchSource;
use crate::minibatch::layout::MbLayout;
use crate::minibatch::{pack_minibatch, PackedBuffers};
use crate::randomizer::BlockRandomizer;
use crate::timeline::SequenceDescription;
use crate::Result;

/// `MinibatchSource` over a randomized deserializer timeline
pub struct RandomizedMinibatchSource<D: Deserializer> {
    randomizer: BlockRandomizer<D>,
}

impl<D: Deserializer> RandomizedMinibatchSource<D> {
    pub fn new(deserializer: D, config: ReaderConfig) -> Result<Self> {
        Ok(Self {
            randomizer: BlockRandomizer::new(deserializer, config)?,
        })
    }

    /// Begin an epoch; must be called before the first minibatch
    pub fn start_epoch(&mut self, epoch: &EpochConfig) -> Result<()> {
        self.randomizer.start_epoch(epoch)
    }

    pub fn randomizer(&self) -> &BlockRandomizer<D> {
        &self.randomizer
    }
}

impl<D: Deserializer> MinibatchSource for RandomizedMinibatchSource<D> {
    type Elem = D::Elem;

    fn next_minibatch(
        &mut self,
        requested_samples: usize,
        buffers: &mut PackedBuffers<D::Elem>,
        layout: &mut MbLayout,
    ) -> Result<usize> {
        let descriptions = self.randomizer.next_sequences(requested_samples)?;

        let mut batch: Vec<(SequenceDescription, SequenceData<D::Elem>)> =
            Vec::with_capacity(descriptions.len());
        for description in descriptions {
            let data = self
                .randomizer
                .deserializer()
                .sequence_data(description.global_id)?;
            batch.push((description, data));
        }

        pack_minibatch(self.randomizer.stream_descriptions(), &batch, buffers, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SoloCommunicator;
    use crate::deserializer::mock::InMemoryDeserializer;
    use crate::feeder::{Network, NetworkFeeder};
    use crate::minibatch::PackedBuffer;

    struct CountingNetwork {
        buffers: PackedBuffers<f32>,
        layout: MbLayout,
        actual_size: usize,
    }

    impl CountingNetwork {
        fn new() -> Self {
            Self {
                buffers: PackedBuffers::new(),
                layout: MbLayout::new(0, 0),
                actual_size: 0,
            }
        }
    }

    impl Network for CountingNetwork {
        type Elem = f32;

        fn minibatch_mut(&mut self) -> (&mut PackedBuffers<f32>, &mut MbLayout) {
            (&mut self.buffers, &mut self.layout)
        }

        fn set_actual_minibatch_size(&mut self, samples: usize) {
            self.actual_size = samples;
        }
    }

    fn source(num_chunks: usize, sequences: usize, samples: usize) -> RandomizedMinibatchSource<InMemoryDeserializer> {
        let deserializer = InMemoryDeserializer::uniform(
            InMemoryDeserializer::single_stream(2),
            num_chunks,
            sequences,
            samples,
        );
        RandomizedMinibatchSource::new(deserializer, ReaderConfig::default()).unwrap()
    }

    #[test]
    fn test_epoch_serves_every_sample_once() {
        let mut src = source(3, 4, 2);
        src.start_epoch(&EpochConfig::single_worker()).unwrap();

        let mut buffers = PackedBuffers::new();
        let mut layout = MbLayout::new(0, 0);
        let mut ids = Vec::new();
        let mut total = 0;
        loop {
            let samples = src.next_minibatch(5, &mut buffers, &mut layout).unwrap();
            if samples == 0 {
                break;
            }
            total += samples;
            // Recover the served ids from the packed data encoding
            let features = &buffers["features"];
            for slot in 0..layout.num_parallel_sequences() {
                let value = features.get(0, slot);
                ids.push((value / 1000.0) as u64);
            }
        }

        assert_eq!(total, 24);
        ids.sort_unstable();
        assert_eq!(ids, (0..12).collect::<Vec<u64>>());
    }

    #[test]
    fn test_buffers_match_layout_shape() {
        let mut src = source(2, 3, 4);
        src.start_epoch(&EpochConfig::single_worker()).unwrap();

        let mut buffers = PackedBuffers::new();
        let mut layout = MbLayout::new(0, 0);
        let samples = src.next_minibatch(8, &mut buffers, &mut layout).unwrap();
        assert!(samples > 0);
        assert_eq!(
            buffers["features"].column_count(),
            layout.column_count()
        );
        assert_eq!(buffers["features"].row_count(), 2);
    }

    #[test]
    fn test_feeds_network_end_to_end() {
        let mut src = source(2, 2, 3);
        src.start_epoch(&EpochConfig::single_worker()).unwrap();

        let feeder = NetworkFeeder::new(SoloCommunicator, false);
        let mut network = CountingNetwork::new();
        let mut total = 0;
        loop {
            let outcome = feeder
                .get_minibatch_into_network(&mut src, &mut network, 6)
                .unwrap();
            if !outcome.more_data {
                break;
            }
            total += outcome.actual_samples;
            assert_eq!(outcome.actual_samples, network.actual_size);
        }
        assert_eq!(total, 12);
    }

    #[test]
    fn test_reuses_caller_buffers() {
        let mut src = source(1, 2, 2);
        src.start_epoch(&EpochConfig::single_worker()).unwrap();

        let mut buffers = PackedBuffers::new();
        buffers.insert("features".to_string(), PackedBuffer::new(7, 9));
        let mut layout = MbLayout::new(5, 5);
        src.next_minibatch(4, &mut buffers, &mut layout).unwrap();

        // Stale shapes are overwritten, not appended to
        assert_eq!(buffers.len(), 1);
        assert_eq!(buffers["features"].row_count(), 2);
        assert_eq!(buffers["features"].column_count(), layout.column_count());
    }
}
