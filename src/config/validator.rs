//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate reader configuration
///
/// Checks only what can be verified without the dataset. The window-budget
/// check against the largest chunk needs the timeline and happens when the
/// chunk randomizer is built.
pub fn validate_reader_config(config: &ReaderConfig) -> Result<()> {
    if config.randomization_range_in_samples == 0 {
        anyhow::bail!("randomization_range_in_samples must be > 0");
    }

    Ok(())
}

/// Validate per-epoch configuration
pub fn validate_epoch_config(config: &EpochConfig) -> Result<()> {
    if config.number_of_workers == 0 {
        anyhow::bail!("number_of_workers must be > 0");
    }

    if config.worker_rank >= config.number_of_workers {
        anyhow::bail!(
            "worker_rank ({}) must be < number_of_workers ({})",
            config.worker_rank,
            config.number_of_workers
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reader_config_defaults_ok() {
        assert!(validate_reader_config(&ReaderConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_reader_config_zero_range() {
        let config = ReaderConfig {
            randomization_range_in_samples: 0,
            ..Default::default()
        };
        assert!(validate_reader_config(&config).is_err());
    }

    #[test]
    fn test_validate_epoch_config() {
        assert!(validate_epoch_config(&EpochConfig::single_worker()).is_ok());

        let bad_rank = EpochConfig {
            worker_rank: 2,
            number_of_workers: 2,
            epoch_size_in_samples: 0,
            epoch_index: 0,
        };
        assert!(validate_epoch_config(&bad_rank).is_err());

        let no_workers = EpochConfig {
            worker_rank: 0,
            number_of_workers: 0,
            epoch_size_in_samples: 0,
            epoch_index: 0,
        };
        assert!(validate_epoch_config(&no_workers).is_err());
    }
}
