//! Network feeding loop
//!
//! One training-loop iteration: pull a minibatch from a source into the
//! network's input buffers, agree across ranks on whether the epoch is
//! over, decimate for parallel training when each rank does not read its
//! own shard, and report the effective sample count.
//!
//! # Architecture
//!
//! Two reading regimes exist for data-parallel training:
//!
//! - **Distributed reading**: every rank's source serves only that rank's
//!   shard, so no decimation is needed, but ranks can run out of data at
//!   different moments. End of epoch is therefore agreed on collectively:
//!   each rank contributes a has-data flag to an all-reduce, and the epoch
//!   ends only when the sum is zero. A rank whose source is exhausted
//!   keeps participating with empty minibatches until then.
//! - **Shared reading**: every rank assembles the identical full
//!   minibatch and the feeder decimates it to this rank's share of the
//!   parallel streams. End of epoch is local, since all ranks read the
//!   same stream.
//!
//! # Modules
//!
//! - `source`: randomizing `MinibatchSource` built from a deserializer

pub mod source;

pub use source::RandomizedMinibatchSource;

use crate::comm::Communicator;
use crate::minibatch::layout::MbLayout;
use crate::minibatch::{decimate_minibatch, PackedBuffers};
use crate::Result;

/// Supplier of packed minibatches
pub trait MinibatchSource {
    /// Buffer element type
    type Elem: Copy + Default;

    /// Fill `buffers` and `layout` with the next minibatch
    ///
    /// `requested_samples` bounds the batch (at least one sequence is
    /// served while data remains). Returns the number of real samples
    /// packed; 0 means no data was read.
    fn next_minibatch(
        &mut self,
        requested_samples: usize,
        buffers: &mut PackedBuffers<Self::Elem>,
        layout: &mut MbLayout,
    ) -> Result<usize>;

    /// Push per-utterance training data for the current minibatch
    ///
    /// Called after a successful read when the network opted in through
    /// [`Network::sequence_training`]. Sources without utterance-level
    /// data keep the default no-op.
    fn fetch_sequence_training_data(&mut self, _sink: &mut dyn SequenceTrainingSink) -> Result<()> {
        Ok(())
    }
}

/// Receiver of utterance-level sequence-training data
///
/// Opt-in capability for criteria that need alignment lattices next to the
/// packed features (e.g. sequence-discriminative training).
pub trait SequenceTrainingSink {
    /// Serialized lattice payload per utterance of the minibatch
    fn set_lattice_data(&mut self, lattices: Vec<Vec<u8>>);

    /// Sample offsets where utterances begin within the minibatch
    fn set_boundaries(&mut self, boundaries: Vec<usize>);

    /// Utterance id per parallel stream slot
    fn set_utterance_map(&mut self, utterances: Vec<u64>);
}

/// Consumer-side view of the model under training
pub trait Network {
    /// Buffer element type
    type Elem: Copy + Default;

    /// Input buffers and their layout, borrowed together
    fn minibatch_mut(&mut self) -> (&mut PackedBuffers<Self::Elem>, &mut MbLayout);

    /// Record the number of samples the network will process this step
    fn set_actual_minibatch_size(&mut self, samples: usize);

    /// Sequence-training capability, when the criterion needs it
    fn sequence_training(&mut self) -> Option<&mut dyn SequenceTrainingSink> {
        None
    }
}

/// Result of one feeding iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOutcome {
    /// False when the epoch is over on every rank
    pub more_data: bool,
    /// Samples this rank will process; may be 0 while `more_data` holds
    pub actual_samples: usize,
}

/// Drives minibatches from a source into a network, one step at a time
pub struct NetworkFeeder<C: Communicator> {
    comm: C,
    use_distributed_reading: bool,
}

impl<C: Communicator> NetworkFeeder<C> {
    pub fn new(comm: C, use_distributed_reading: bool) -> Self {
        Self {
            comm,
            use_distributed_reading,
        }
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    /// Pull one minibatch into the network
    ///
    /// Returns `more_data == false` only at the agreed end of epoch. With
    /// distributed reading a rank may receive `more_data == true` together
    /// with zero samples; the caller runs that step with an empty batch so
    /// collectives inside the training step stay aligned.
    pub fn get_minibatch_into_network<S, N>(
        &self,
        source: &mut S,
        network: &mut N,
        requested_samples: usize,
    ) -> Result<FeedOutcome>
    where
        S: MinibatchSource,
        N: Network<Elem = S::Elem>,
    {
        let samples_read = {
            let (buffers, layout) = network.minibatch_mut();
            source.next_minibatch(requested_samples, buffers, layout)?
        };
        let was_data_read = samples_read > 0;
        let parallel_train = self.comm.num_ranks() > 1;

        if parallel_train && self.use_distributed_reading {
            let mut has_data = [i64::from(was_data_read)];
            self.comm.all_reduce_sum(&mut has_data)?;
            if has_data[0] == 0 {
                network.set_actual_minibatch_size(0);
                return Ok(FeedOutcome {
                    more_data: false,
                    actual_samples: 0,
                });
            }
        } else if !was_data_read {
            network.set_actual_minibatch_size(0);
            return Ok(FeedOutcome {
                more_data: false,
                actual_samples: 0,
            });
        } else if parallel_train {
            let (buffers, layout) = network.minibatch_mut();
            decimate_minibatch(buffers, layout, self.comm.rank(), self.comm.num_ranks())?;
        }

        if was_data_read {
            if let Some(sink) = network.sequence_training() {
                source.fetch_sequence_training_data(sink)?;
            }
        }

        let actual_samples = {
            let (_, layout) = network.minibatch_mut();
            layout.num_valid_cells()
        };
        network.set_actual_minibatch_size(actual_samples);

        Ok(FeedOutcome {
            more_data: true,
            actual_samples,
        })
    }
}
