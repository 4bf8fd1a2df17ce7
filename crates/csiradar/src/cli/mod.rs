//! Command-line interface for csiradar.
//!
//! This module provides the CLI structure and command handlers for the
//! `csiradar` binary.

mod commands;
mod handlers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, GenerateCommand, InspectCommand, ValidateCommand};
pub use handlers::{
    default_file_name, handle_config, handle_generate, handle_inspect, handle_validate,
    read_packet_file,
};

use crate::logging::Verbosity;

/// csiradar - Decode and check radar/CSI telemetry packets
///
/// Reads the binary packets sent by the receiver firmware, checks them
/// structurally and semantically, and generates sample packets.
#[derive(Debug, Parser)]
#[command(name = "csiradar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode one packet file and print the record
    Inspect(InspectCommand),

    /// Check packet files, exiting non-zero if any is rejected
    Validate(ValidateCommand),

    /// Write a sample packet
    Generate(GenerateCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
