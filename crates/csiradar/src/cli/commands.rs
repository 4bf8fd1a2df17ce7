//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::fixture::Preset;

/// Inspect command arguments.
#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Packet file to decode
    pub file: PathBuf,

    /// Output the full record as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Validate command arguments.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Packet files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output one JSON object per file
    #[arg(short, long)]
    pub json: bool,
}

/// Generate command arguments.
///
/// Unset options fall back to the `[fixtures]` configuration section.
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Sample to generate
    #[arg(short, long, value_enum)]
    pub preset: Option<Preset>,

    /// Number of CSI samples
    #[arg(long, value_name = "N")]
    pub csi_len: Option<u32>,

    /// Seed for the CSI noise
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Fixed capture time in milliseconds since the Unix epoch
    #[arg(long, value_name = "MS")]
    pub timestamp_ms: Option<u64>,

    /// Output file (defaults to `sample_packet_<preset>.bin` in the output directory)
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_generate_command_defaults_to_config() {
        let cmd = GenerateCommand {
            preset: None,
            csi_len: None,
            seed: None,
            timestamp_ms: None,
            out: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("preset: None"));
    }
}
