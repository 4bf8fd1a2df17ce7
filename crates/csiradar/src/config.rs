//! Configuration management for csiradar.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::decode::{Decoder, LengthPolicy};
use crate::error::{Error, Result};
use crate::fixture::{FixtureBuilder, Preset};
use crate::wire::MAX_CSI_LEN;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration directory name.
const CONFIG_DIR_NAME: &str = "csiradar";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "CSIRADAR_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CSIRADAR_`, sections separated
///    by a double underscore, e.g. `CSIRADAR_DECODER__LENGTH_POLICY`)
/// 2. TOML config file at `~/.config/csiradar/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoder configuration.
    pub decoder: DecoderConfig,
    /// Fixture generation configuration.
    pub fixtures: FixtureConfig,
}

/// Decoder-related configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// What to do when `csi_len` leaves bytes unread.
    pub length_policy: LengthPolicy,
}

/// Fixture-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Directory generated packets are written to.
    pub output_dir: PathBuf,
    /// Preset used when none is given on the command line.
    pub preset: Preset,
    /// Number of CSI samples; at most [`MAX_CSI_LEN`] so `packet_length` fits.
    pub csi_len: u32,
    /// Seed for the CSI noise.
    pub seed: u64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            preset: Preset::default(),
            csi_len: 128,
            seed: 0,
        }
    }
}

impl DecoderConfig {
    /// Build a decoder with these settings.
    #[must_use]
    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.length_policy)
    }
}

impl FixtureConfig {
    /// Start a fixture from these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `csi_len` is above [`MAX_CSI_LEN`].
    pub fn builder(&self) -> Result<FixtureBuilder> {
        Ok(FixtureBuilder::new(self.preset)
            .csi_len(self.wire_csi_len()?)
            .seed(self.seed))
    }

    fn wire_csi_len(&self) -> Result<u16> {
        u16::try_from(self.csi_len)
            .ok()
            .filter(|&csi_len| csi_len <= MAX_CSI_LEN)
            .ok_or_else(|| Error::ConfigValidation {
                message: format!(
                    "fixtures.csi_len ({}) cannot exceed {MAX_CSI_LEN}",
                    self.csi_len
                ),
            })
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CSIRADAR_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.fixtures.wire_csi_len()?;

        if self.fixtures.output_dir.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "fixtures.output_dir cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
