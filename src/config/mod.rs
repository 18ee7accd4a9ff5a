//! Configuration module
//!
//! Handles reader and epoch configuration, TOML loading, and validation.

pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};

/// Reader-wide configuration, fixed for the lifetime of a randomizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Verbosity level (0 = quiet, 1 = progress, 2 = per-sweep detail)
    #[serde(default)]
    pub verbosity: u32,

    /// Randomization window budget, in samples. Sequences may only trade
    /// places within a run of chunks whose cumulative sample count stays
    /// inside this budget.
    #[serde(default = "default_randomization_range")]
    pub randomization_range_in_samples: usize,

    /// Granularity at which work is assigned to workers during reading
    #[serde(default)]
    pub distribution_mode: DistributionMode,

    /// Shuffle algorithm variant, selected once at construction
    #[serde(default)]
    pub randomization_mode: RandomizationMode,

    /// Base seed mixed with the sweep index to derive each sweep's RNG
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            randomization_range_in_samples: default_randomization_range(),
            distribution_mode: DistributionMode::default(),
            randomization_mode: RandomizationMode::default(),
            random_seed: 0,
        }
    }
}

fn default_randomization_range() -> usize {
    // One sweep's worth of samples fits most corpora; callers with huge
    // datasets should size this to available memory.
    10_000_000
}

/// Work-assignment granularity for distributed reading
///
/// Both modes are round-robin; they differ only in the unit handed to each
/// worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    /// Different chunks go to different workers
    Chunks,
    /// Different sequences go to different workers
    #[default]
    Sequences,
}

/// Shuffle algorithm variant
///
/// `Windowed` is the reproducible xoshiro-based shuffle. `Legacy` replays
/// the historical LCG-based shuffle for order compatibility with runs
/// produced by older readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RandomizationMode {
    #[default]
    Windowed,
    Legacy,
}

/// Per-epoch configuration, set once by `start_epoch`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Rank of this worker within the data-parallel group
    pub worker_rank: usize,
    /// Total number of workers reading in parallel
    pub number_of_workers: usize,
    /// Epoch budget in samples; 0 means one full sweep
    pub epoch_size_in_samples: usize,
    /// Zero-based epoch index, used to position the global sample cursor
    #[serde(default)]
    pub epoch_index: usize,
}

impl EpochConfig {
    /// Single-worker epoch covering one full sweep
    pub fn single_worker() -> Self {
        Self {
            worker_rank: 0,
            number_of_workers: 1,
            epoch_size_in_samples: 0,
            epoch_index: 0,
        }
    }
}
