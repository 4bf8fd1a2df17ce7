//! `csiradar` - CLI for the csiradar packet library
//!
//! Inspects, validates and generates the binary telemetry packets sent by the
//! radar/CSI receiver firmware.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use csiradar::cli::{
    handle_config, handle_generate, handle_inspect, handle_validate, Cli, Command,
};
use csiradar::{init_logging, Config};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let mut stdout = std::io::stdout().lock();

    // Execute the command
    let success = match &cli.command {
        Command::Inspect(cmd) => {
            handle_inspect(&mut stdout, cmd, &config)
                .with_context(|| format!("inspecting {}", cmd.file.display()))?;
            true
        }
        Command::Validate(cmd) => handle_validate(&mut stdout, cmd, &config)?,
        Command::Generate(cmd) => {
            handle_generate(&mut stdout, cmd, &config)?;
            true
        }
        Command::Config(cmd) => handle_config(&mut stdout, cmd, &config, cli.config.as_deref())?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
