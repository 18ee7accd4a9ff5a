//! Sweep-level sequence randomization and batch serving
//!
//! `BlockRandomizer` owns the per-sweep state: the chunk randomization,
//! the randomized sequence timeline, and the epoch/sweep cursors. The
//! randomized timeline is rebuilt wholesale when a sweep boundary is
//! crossed; it is never mutated cell by cell afterwards.
//!
//! Sequence randomization is in-place swap sampling: walking positions in
//! increasing order, each position draws replacement candidates from its
//! chunk's window until a swap is found that keeps both sequences inside
//! their windows. Because candidates are only ever swapped, the result is
//! a true permutation of the sweep, verified before it is served.

use crate::config::validator::{validate_epoch_config, validate_reader_config};
use crate::config::{DistributionMode, EpochConfig, ReaderConfig};
use crate::deserializer::Deserializer;
use crate::error::FeedError;
use crate::randomizer::chunks::{randomize_chunks, ChunkRandomization};
use crate::randomizer::rng::SweepRng;
use crate::timeline::{SequenceDescription, StreamDescription, TimelineInfo};
use crate::Result;
use std::collections::HashSet;

// Retries of random candidate draws before falling back to a linear scan
// of the window. The scan is deterministic, so reproducibility holds
// either way.
const MAX_SWAP_ATTEMPTS: usize = 1024;

/// A sequence on the randomized timeline
#[derive(Debug, Clone, Copy)]
struct RandomizedSequence {
    /// Original description (identity, chunk, length)
    description: SequenceDescription,
    /// Index of the owning chunk on the *randomized* chunk timeline
    randomized_chunk_index: usize,
}

/// Chunk-aware randomizing sequence server
///
/// Wraps a deserializer and serves its sequences in a deterministic
/// pseudo-random order that respects the randomization-range budget.
///
/// # Lifecycle
///
/// 1. `new()` validates the timeline and the window budget
/// 2. `start_epoch()` positions the cursors for one epoch
/// 3. `next_sequences()` serves batches until it returns an empty batch,
///    which is the defined end-of-epoch signal, not an error
pub struct BlockRandomizer<D: Deserializer> {
    config: ReaderConfig,
    deserializer: D,
    info: TimelineInfo,

    // Per-epoch configuration
    epoch: Option<EpochConfig>,
    epoch_size_in_samples: usize,
    sample_position_in_epoch: usize,

    // Per-sweep state
    sweep: Option<u64>,
    sequence_position_in_sweep: usize,
    chunk_randomization: ChunkRandomization,
    random_timeline: Vec<RandomizedSequence>,
}

impl<D: Deserializer> BlockRandomizer<D> {
    /// Create a randomizer over the deserializer's timeline
    ///
    /// Fails fast on an invalid configuration, a malformed timeline, or a
    /// randomization range smaller than the largest chunk.
    pub fn new(deserializer: D, config: ReaderConfig) -> Result<Self> {
        validate_reader_config(&config)?;
        let info = TimelineInfo::from_timeline(deserializer.sequence_timeline())?;

        let largest = info.max_chunk_samples();
        if largest > config.randomization_range_in_samples {
            return Err(FeedError::configuration(format!(
                "randomization range ({} samples) is smaller than the largest chunk ({} samples)",
                config.randomization_range_in_samples, largest
            ))
            .into());
        }

        Ok(Self {
            config,
            deserializer,
            info,
            epoch: None,
            epoch_size_in_samples: 0,
            sample_position_in_epoch: 0,
            sweep: None,
            sequence_position_in_sweep: 0,
            chunk_randomization: ChunkRandomization {
                chunks: Vec::new(),
                sequence_position_to_chunk_index: Vec::new(),
            },
            random_timeline: Vec::new(),
        })
    }

    /// Stream metadata, forwarded from the deserializer
    pub fn stream_descriptions(&self) -> &[StreamDescription] {
        self.deserializer.stream_descriptions()
    }

    /// The wrapped deserializer
    pub fn deserializer(&self) -> &D {
        &self.deserializer
    }

    /// Total samples in one sweep
    pub fn total_samples(&self) -> usize {
        self.info.num_samples
    }

    /// Total sequences in one sweep
    pub fn total_sequences(&self) -> usize {
        self.info.num_sequences
    }

    /// Begin an epoch
    ///
    /// Resets the epoch sample cursor and positions the sweep cursor at
    /// the global sample `epoch_index * epoch_size_in_samples`, so a
    /// restarted job resumes mid-timeline deterministically. An epoch size
    /// of 0 means one full sweep.
    pub fn start_epoch(&mut self, epoch: &EpochConfig) -> Result<()> {
        validate_epoch_config(epoch)?;

        self.epoch_size_in_samples = if epoch.epoch_size_in_samples == 0 {
            self.info.num_samples
        } else {
            epoch.epoch_size_in_samples
        };
        self.sample_position_in_epoch = 0;
        self.epoch = Some(*epoch);

        if self.info.num_sequences > 0 {
            let global_start = self
                .epoch_size_in_samples
                .checked_mul(epoch.epoch_index)
                .ok_or_else(|| FeedError::configuration("epoch start position overflows"))?;
            self.randomize_for_global_sample_position(global_start)?;

            if self.config.verbosity >= 1 {
                eprintln!(
                    "BlockRandomizer: epoch {} starts at global sample {} (sweep {}, worker {}/{})",
                    epoch.epoch_index,
                    global_start,
                    self.sweep.unwrap_or(0),
                    epoch.worker_rank,
                    epoch.number_of_workers
                );
            }
        }

        Ok(())
    }

    /// Serve the next batch of sequence descriptions
    ///
    /// Returns descriptions whose cumulative sample length does not exceed
    /// `sample_count`, but always at least one sequence while the epoch
    /// budget lasts (so a single long sequence cannot stall the loop; it
    /// may overshoot both the request and the epoch tail). Cursors advance
    /// atomically with the returned batch. An empty result means end of
    /// epoch.
    ///
    /// When several workers read in parallel, each worker only receives
    /// its round-robin share (by chunk or by sequence position, per the
    /// configured distribution mode); a batch may therefore legitimately
    /// be empty mid-epoch for one worker while its cursors still advance.
    pub fn next_sequences(&mut self, sample_count: usize) -> Result<Vec<SequenceDescription>> {
        let epoch = self
            .epoch
            .ok_or_else(|| FeedError::invariant("next_sequences called before start_epoch"))?;

        if self.info.num_sequences == 0
            || self.sample_position_in_epoch >= self.epoch_size_in_samples
        {
            return Ok(Vec::new());
        }

        let mut budget = sample_count
            .max(1)
            .min(self.epoch_size_in_samples - self.sample_position_in_epoch);
        let mut batch = Vec::new();
        let mut first = true;

        loop {
            self.randomize_if_new_sweep_is_entered()?;

            let sequence = self.random_timeline[self.sequence_position_in_sweep];
            let length = sequence.description.length_in_samples;
            if !first && length > budget {
                break;
            }

            let is_local = match self.config.distribution_mode {
                DistributionMode::Chunks => {
                    sequence.randomized_chunk_index % epoch.number_of_workers == epoch.worker_rank
                }
                DistributionMode::Sequences => {
                    self.sequence_position_in_sweep % epoch.number_of_workers == epoch.worker_rank
                }
            };
            if is_local {
                batch.push(sequence.description);
            }

            budget = budget.saturating_sub(length);
            self.sample_position_in_epoch += length;
            self.sequence_position_in_sweep += 1;
            first = false;

            if budget == 0 || self.sample_position_in_epoch >= self.epoch_size_in_samples {
                break;
            }
        }

        Ok(batch)
    }

    /// Map a global sample position onto (sweep, position in sweep),
    /// re-randomizing if the sweep changed
    fn randomize_for_global_sample_position(&mut self, global_sample: usize) -> Result<()> {
        let sweep = (global_sample / self.info.num_samples) as u64;
        let offset_in_sweep = global_sample % self.info.num_samples;

        if self.sweep != Some(sweep) {
            self.sweep = Some(sweep);
            self.randomize(sweep)?;
        }

        // Find the sequence containing the sample offset
        let mut samples_seen = 0usize;
        let mut position = 0usize;
        while position < self.random_timeline.len() {
            let length = self.random_timeline[position].description.length_in_samples;
            if samples_seen + length > offset_in_sweep {
                break;
            }
            samples_seen += length;
            position += 1;
        }
        self.sequence_position_in_sweep = position;

        Ok(())
    }

    /// Roll over to the next sweep when the current one is exhausted
    fn randomize_if_new_sweep_is_entered(&mut self) -> Result<()> {
        if self.sequence_position_in_sweep >= self.info.num_sequences {
            let sweep = self.sweep.map_or(0, |s| s + 1);
            self.sweep = Some(sweep);
            self.sequence_position_in_sweep = 0;
            self.randomize(sweep)?;
        }
        Ok(())
    }

    /// Rebuild the randomized timeline for one sweep
    fn randomize(&mut self, sweep: u64) -> Result<()> {
        let mut rng = SweepRng::for_sweep(
            self.config.randomization_mode,
            self.config.random_seed,
            sweep,
        );

        self.chunk_randomization = randomize_chunks(
            &self.info,
            self.config.randomization_range_in_samples,
            &mut rng,
        )?;

        // Lay sequences out in randomized chunk order
        let timeline = self.deserializer.sequence_timeline();
        self.random_timeline.clear();
        self.random_timeline.reserve(self.info.num_sequences);
        for (randomized_chunk_index, chunk) in self
            .chunk_randomization
            .chunks
            .iter()
            .enumerate()
            .take(self.chunk_randomization.num_chunks())
        {
            let original = chunk.original_chunk_index;
            let begin = self.info.chunk_information[original].sequence_position_start;
            let end = self.info.chunk_information[original + 1].sequence_position_start;
            for description in &timeline[begin..end] {
                self.random_timeline.push(RandomizedSequence {
                    description: *description,
                    randomized_chunk_index,
                });
            }
        }

        // Swap sampling: each position draws from its window until the
        // exchange is legal from both sides
        for i in 0..self.random_timeline.len() {
            let chunk = self.chunk_randomization.chunk_for_position(i);
            let window_begin = chunk.window_begin;
            let window_end = chunk.window_end;
            let position_begin =
                self.chunk_randomization.chunks[window_begin].info.sequence_position_start;
            let position_end =
                self.chunk_randomization.chunks[window_end].info.sequence_position_start;

            let mut chosen = None;
            for _ in 0..MAX_SWAP_ATTEMPTS {
                let j = rng.next_range(position_begin, position_end);
                if self.is_valid_for_position(i, &self.random_timeline[j])
                    && self.is_valid_for_position(j, &self.random_timeline[i])
                {
                    chosen = Some(j);
                    break;
                }
            }
            let j = match chosen {
                Some(j) => j,
                // Extremely skewed windows can starve rejection sampling;
                // fall back to the first legal candidate, still
                // deterministic.
                None => (position_begin..position_end)
                    .find(|&j| {
                        self.is_valid_for_position(i, &self.random_timeline[j])
                            && self.is_valid_for_position(j, &self.random_timeline[i])
                    })
                    .ok_or_else(|| {
                        FeedError::invariant(format!(
                            "no legal swap candidate for sweep position {}",
                            i
                        ))
                    })?,
            };
            self.random_timeline.swap(i, j);
        }

        self.verify_randomization(sweep)?;

        if self.config.verbosity >= 2 {
            eprintln!(
                "BlockRandomizer: sweep {} randomized ({} chunks, {} sequences)",
                sweep,
                self.info.num_chunks,
                self.info.num_sequences
            );
        }

        Ok(())
    }

    /// Target position's chunk window must contain the sequence's chunk
    fn is_valid_for_position(
        &self,
        target_position: usize,
        sequence: &RandomizedSequence,
    ) -> bool {
        let chunk = self.chunk_randomization.chunk_for_position(target_position);
        chunk.window_begin <= sequence.randomized_chunk_index
            && sequence.randomized_chunk_index < chunk.window_end
    }

    /// Check the sweep produced a window-respecting permutation
    fn verify_randomization(&self, sweep: u64) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.random_timeline.len());
        for (position, sequence) in self.random_timeline.iter().enumerate() {
            if !self.is_valid_for_position(position, sequence) {
                return Err(FeedError::invariant(format!(
                    "sweep {}: sequence {} landed outside its randomization window at position {}",
                    sweep, sequence.description.global_id, position
                ))
                .into());
            }
            if !seen.insert(sequence.description.global_id) {
                return Err(FeedError::invariant(format!(
                    "sweep {}: sequence {} appears more than once",
                    sweep, sequence.description.global_id
                ))
                .into());
            }
        }
        if seen.len() != self.info.num_sequences {
            return Err(FeedError::invariant(format!(
                "sweep {}: {} of {} sequences present after randomization",
                sweep,
                seen.len(),
                self.info.num_sequences
            ))
            .into());
        }
        Ok(())
    }
}
