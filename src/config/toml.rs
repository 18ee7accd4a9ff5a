//! TOML configuration file parsing

use super::*;
use crate::config::validator::validate_reader_config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse and validate a reader configuration file
pub fn parse_toml_file(path: &Path) -> Result<ReaderConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse and validate a reader configuration from a TOML string
pub fn parse_toml_string(contents: &str) -> Result<ReaderConfig> {
    let config: ReaderConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    validate_reader_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
verbosity = 1
randomization_range_in_samples = 50000
distribution_mode = "chunks"
random_seed = 42
"#;

        let config = parse_toml_string(toml).unwrap();
        assert_eq!(config.verbosity, 1);
        assert_eq!(config.randomization_range_in_samples, 50000);
        assert_eq!(config.distribution_mode, DistributionMode::Chunks);
        assert_eq!(config.randomization_mode, RandomizationMode::Windowed);
        assert_eq!(config.random_seed, 42);
    }

    #[test]
    fn test_parse_toml_defaults() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.distribution_mode, DistributionMode::Sequences);
        assert!(config.randomization_range_in_samples > 0);
    }

    #[test]
    fn test_parse_toml_legacy_mode() {
        let config = parse_toml_string(r#"randomization_mode = "legacy""#).unwrap();
        assert_eq!(config.randomization_mode, RandomizationMode::Legacy);
    }

    #[test]
    fn test_parse_toml_rejects_zero_range() {
        assert!(parse_toml_string("randomization_range_in_samples = 0").is_err());
    }
}
