//! Configuration file support for visitrec.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/visitrec/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub adherence: AdherenceConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Adherence bands used by the problem detector
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdherenceConfig {
    /// Below this percentage adherence is low
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,

    /// Expected adherence; below it (but above low) is a warning, above it too
    #[serde(default = "default_expected_threshold")]
    pub expected_threshold: f64,
}

impl Default for AdherenceConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            expected_threshold: default_expected_threshold(),
        }
    }
}

/// Submission policy
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    #[serde(default)]
    pub warnings_block_submission: bool,
}

/// Presentation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Shown for calculated values that cannot be computed
    #[serde(default = "default_empty_placeholder")]
    pub empty_placeholder: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            empty_placeholder: default_empty_placeholder(),
        }
    }
}

// Default value functions
fn default_low_threshold() -> f64 {
    80.0
}

fn default_expected_threshold() -> f64 {
    100.0
}

fn default_empty_placeholder() -> String {
    "—".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            path => {
                tracing::info!("No config file found at {:?}, using defaults", path);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// `None` when the platform has no config directory and HOME is unset.
    pub fn default_config_path() -> Option<PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("visitrec").join("config.toml"))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check that the settings are consistent
    pub fn validate(&self) -> Result<()> {
        let adherence = &self.adherence;
        if adherence.low_threshold > adherence.expected_threshold {
            return Err(Error::Config(format!(
                "adherence.low_threshold ({}) is above adherence.expected_threshold ({})",
                adherence.low_threshold, adherence.expected_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.adherence.low_threshold, 80.0);
        assert_eq!(config.adherence.expected_threshold, 100.0);
        assert!(!config.validation.warnings_block_submission);
        assert_eq!(config.display.empty_placeholder, "—");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.adherence, parsed.adherence);
        assert_eq!(
            config.display.empty_placeholder,
            parsed.display.empty_placeholder
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[adherence]
low_threshold = 85.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.adherence.low_threshold, 85.0);
        assert_eq!(config.adherence.expected_threshold, 100.0); // default
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.validation.warnings_block_submission = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.validation.warnings_block_submission);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[adherence]\nlow_threshold = 95.0\nexpected_threshold = 90.0\n",
        )
        .unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
