//! `csiradar` - Decoder and validator for radar/Wi-Fi CSI telemetry packets
//!
//! Receiver firmware sends one little-endian binary packet per capture: a
//! fixed 114-byte header (identity, counters, radio metadata and two groups
//! of three radar targets) followed by `csi_len` complex CSI samples. This
//! library recognizes such buffers, decodes them into [`RadarPacket`]
//! records, checks the records, and encodes packets back.
//!
//! The acceptance path is [`ingest`]: [`validate::validate`], then
//! [`decode::Decoder`], then [`semantic::check`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod fixture;
pub mod ingest;
pub mod location;
pub mod logging;
pub mod packet;
pub mod semantic;
pub mod validate;
pub mod wire;

pub use config::{Config, DecoderConfig};
pub use decode::{decode, ConsistencyWarning, Decoder, LengthPolicy};
pub use encode::{encode, encode_packet, PacketFields};
pub use error::{Error, ErrorKind, FieldViolation, Result};
pub use fixture::{FixtureBuilder, Preset};
pub use ingest::{ingest, IngestReport, Summary};
pub use location::{Building, Room};
pub use logging::init_logging;
pub use packet::{CsiSample, RadarPacket, RadarTarget, RadarTargets};
pub use validate::validate;
