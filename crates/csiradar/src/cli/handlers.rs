//! Command handlers.
//!
//! Each handler writes its report to `out` so the binary can hand in stdout
//! and tests can hand in a buffer.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use serde::Serialize;
use tracing::debug;

use super::commands::{ConfigCommand, GenerateCommand, InspectCommand, ValidateCommand};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fixture::Preset;
use crate::ingest::{ingest, IngestReport};
use crate::location::{describe_building, describe_room};
use crate::validate::Validation;

/// Read a whole packet file.
///
/// # Errors
///
/// Returns [`Error::FileRead`] naming the path.
pub fn read_packet_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode one file and print the record.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the packet is rejected.
pub fn handle_inspect(out: &mut impl Write, cmd: &InspectCommand, config: &Config) -> Result<()> {
    let buffer = read_packet_file(&cmd.file)?;
    let report = ingest(&buffer, &config.decoder)?;

    if cmd.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_report(out, &cmd.file, &report)?;
    }
    Ok(())
}

fn write_report(out: &mut impl Write, file: &Path, report: &IngestReport) -> Result<()> {
    let packet = &report.packet;
    let timestamp = packet.timestamp().map_or_else(
        || "out of range".to_string(),
        |t| t.to_rfc3339_opts(SecondsFormat::Millis, true),
    );

    writeln!(out, "Packet: {}", file.display())?;
    writeln!(out, "  Receiver:     {} (v{})", packet.rx_mac, packet.version)?;
    writeln!(
        out,
        "  Location:     {} / {}",
        describe_room(packet.room_id),
        describe_building(packet.building_id)
    )?;
    writeln!(
        out,
        "  Sequence:     {} (CSI counter {})",
        packet.seq_number, packet.csi_counter
    )?;
    writeln!(out, "  Timestamp:    {timestamp} ({} ms)", packet.timestamp_ms)?;
    writeln!(
        out,
        "  Signal:       {} dBm on channel {}",
        packet.rssi, packet.channel
    )?;
    writeln!(
        out,
        "  CSI samples:  {} (mean amplitude {:.1})",
        packet.csi_len,
        mean_amplitude(report)
    )?;

    let mut targets = packet.valid_targets().peekable();
    if targets.peek().is_none() {
        writeln!(out, "  Targets:      none")?;
    } else {
        writeln!(out, "  Targets:")?;
        for (sensor, t) in targets {
            writeln!(
                out,
                "    sensor {sensor} track {:>3}: x={} y={} mm, {} mm away, {} cm/s, {:.1} deg",
                t.track_id,
                t.x_mm,
                t.y_mm,
                t.dist_mm,
                t.speed_cms,
                t.angle_deg()
            )?;
        }
    }

    for warning in &report.warnings {
        writeln!(out, "  Warning:      {warning}")?;
    }
    Ok(())
}

fn mean_amplitude(report: &IngestReport) -> f64 {
    let packet = &report.packet;
    if packet.csi_data.is_empty() {
        return 0.0;
    }
    let total: f64 = packet.csi_data.iter().map(|s| s.amplitude()).sum();
    total / f64::from(packet.csi_len)
}

#[derive(Debug, Serialize)]
struct FileValidation<'a> {
    file: &'a Path,
    #[serde(flatten)]
    validation: Validation,
}

/// Check every file, reporting each one.
///
/// Returns `true` only if every file was accepted.
///
/// # Errors
///
/// Returns an error only if the report itself cannot be written.
pub fn handle_validate(
    out: &mut impl Write,
    cmd: &ValidateCommand,
    config: &Config,
) -> Result<bool> {
    let mut all_valid = true;

    for file in &cmd.files {
        let result = read_packet_file(file)
            .and_then(|buffer| ingest(&buffer, &config.decoder))
            .map(|_| ());
        let validation = Validation::from(&result);
        all_valid &= validation.valid;

        if cmd.json {
            let line = FileValidation { file, validation };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        } else {
            match (&validation.code, &validation.error) {
                (Some(code), Some(error)) => {
                    writeln!(out, "FAIL {}: [{code}] {error}", file.display())?;
                }
                _ => writeln!(out, "OK   {}", file.display())?,
            }
        }
    }

    debug!(files = cmd.files.len(), all_valid, "Validation finished");
    Ok(all_valid)
}

/// File name a preset is written to when no output path is given.
#[must_use]
pub fn default_file_name(preset: Preset) -> String {
    format!("sample_packet_{}.bin", preset.to_string().replace('-', "_"))
}

/// Write a sample packet, returning the path written.
///
/// # Errors
///
/// Returns an error if the configured sample count does not fit the wire,
/// or the file cannot be written.
pub fn handle_generate(
    out: &mut impl Write,
    cmd: &GenerateCommand,
    config: &Config,
) -> Result<PathBuf> {
    let mut fixtures = config.fixtures.clone();
    if let Some(preset) = cmd.preset {
        fixtures.preset = preset;
    }
    if let Some(csi_len) = cmd.csi_len {
        fixtures.csi_len = csi_len;
    }
    if let Some(seed) = cmd.seed {
        fixtures.seed = seed;
    }

    let mut builder = fixtures.builder()?;
    if let Some(timestamp_ms) = cmd.timestamp_ms {
        builder = builder.timestamp_ms(timestamp_ms);
    }
    let bytes = builder.build()?;

    let path = cmd
        .out
        .clone()
        .unwrap_or_else(|| fixtures.output_dir.join(default_file_name(fixtures.preset)));
    std::fs::write(&path, &bytes).map_err(|source| Error::FileWrite {
        path: path.clone(),
        source,
    })?;

    writeln!(
        out,
        "Wrote {} ({} bytes, preset {}, {} CSI samples, seed {})",
        path.display(),
        bytes.len(),
        fixtures.preset,
        fixtures.csi_len,
        fixtures.seed
    )?;
    Ok(path)
}

/// Show, locate or validate configuration.
///
/// `config_path` is the file given on the command line, if any. Returns
/// `false` if `config validate` found a problem.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn handle_config(
    out: &mut impl Write,
    cmd: &ConfigCommand,
    config: &Config,
    config_path: Option<&Path>,
) -> Result<bool> {
    let active_path = || {
        config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_config_path)
    };

    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
            } else {
                writeln!(out, "Current Configuration")?;
                writeln!(out, "=====================")?;
                writeln!(out)?;
                writeln!(out, "[Decoder]")?;
                writeln!(
                    out,
                    "  Length policy:  {}",
                    config.decoder.length_policy
                )?;
                writeln!(out)?;
                writeln!(out, "[Fixtures]")?;
                writeln!(
                    out,
                    "  Output dir:     {}",
                    config.fixtures.output_dir.display()
                )?;
                writeln!(out, "  Preset:         {}", config.fixtures.preset)?;
                writeln!(out, "  CSI length:     {}", config.fixtures.csi_len)?;
                writeln!(out, "  Seed:           {}", config.fixtures.seed)?;
            }
            Ok(true)
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", active_path().display())?;
            Ok(true)
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(active_path);
            writeln!(out, "Validating configuration: {}", path.display())?;
            match Config::load_from(Some(path)) {
                Ok(_) => {
                    writeln!(out, "Configuration is valid.")?;
                    Ok(true)
                }
                Err(e) => {
                    writeln!(out, "Configuration error: {e}")?;
                    Ok(false)
                }
            }
        }
    }
}
