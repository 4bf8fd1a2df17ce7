//! The full acceptance path for one buffer.
//!
//! A buffer is accepted only if it passes, in order, structural validation,
//! decoding and semantic validation. The decoder is never reached for a
//! buffer that fails structural validation.

use serde::{Serialize, Serializer};
use tracing::{info, trace};

use crate::config::DecoderConfig;
use crate::decode::ConsistencyWarning;
use crate::error::Result;
use crate::location::{describe_building, describe_room};
use crate::packet::RadarPacket;
use crate::semantic;
use crate::validate::validate;

/// Identifying fields of an accepted packet.
///
/// `timestamp_ms` and `seq_number` serialize as decimal strings so 64-bit
/// values reach JSON consumers intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Receiver hardware address.
    pub rx_mac: String,
    /// Capture time, milliseconds since the Unix epoch.
    #[serde(serialize_with = "decimal")]
    pub timestamp_ms: u64,
    /// Device sequence number.
    #[serde(serialize_with = "decimal")]
    pub seq_number: u64,
    /// Room identifier.
    pub room_id: u8,
    /// Building identifier.
    pub building_id: u8,
}

impl From<&RadarPacket> for Summary {
    fn from(packet: &RadarPacket) -> Self {
        Self {
            rx_mac: packet.rx_mac.clone(),
            timestamp_ms: packet.timestamp_ms,
            seq_number: packet.seq_number,
            room_id: packet.room_id,
            building_id: packet.building_id,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn decimal<S: Serializer>(value: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// An accepted packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Identifying fields, as handed back to the sender.
    pub summary: Summary,
    /// Non-fatal length disagreements accepted by the decoder.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ConsistencyWarning>,
    /// The full record for persistence.
    pub packet: RadarPacket,
}

/// Validate, decode and semantically check `buffer`.
///
/// # Errors
///
/// Returns the first structural error, or a semantic error listing every
/// violated field.
pub fn ingest(buffer: &[u8], config: &DecoderConfig) -> Result<IngestReport> {
    validate(buffer)?;
    trace!(bytes = buffer.len(), "Structural validation passed");

    let decoded = config.decoder().decode_with_warnings(buffer)?;
    semantic::check(&decoded.packet)?;

    let summary = Summary::from(&decoded.packet);
    info!(
        rx_mac = %summary.rx_mac,
        seq_number = summary.seq_number,
        room = %describe_room(summary.room_id),
        building = %describe_building(summary.building_id),
        "Accepted radar packet"
    );

    Ok(IngestReport {
        summary,
        warnings: decoded.warnings,
        packet: decoded.packet,
    })
}
