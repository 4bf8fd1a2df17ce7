//! Sample packet generation.
//!
//! [`FixtureBuilder`] produces the packets the receiver firmware would send,
//! for tests and for exercising downstream consumers without hardware. CSI
//! noise is drawn from a blake3 XOF keyed by a seed, so a given
//! `(preset, csi_len, seed)` always yields the same samples.

use std::fmt;

use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encode::{encode, PacketFields};
use crate::error::Result;
use crate::location::{Building, Room};
use crate::packet::{CsiSample, RadarTarget};
use crate::wire::MAC_LEN;

/// In-phase noise is drawn from `[-I_SPAN / 2, I_SPAN / 2 - 1]`.
const I_SPAN: u8 = 60;
/// Quadrature noise is drawn from `[-Q_SPAN / 2, Q_SPAN / 2 - 1]`.
const Q_SPAN: u8 = 40;

/// Domain separator for the noise stream.
const NOISE_CONTEXT: &[u8] = b"csiradar fixture noise v1";

/// Canned packets matching the firmware's reference captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Living room, two targets on the first sensor and one on the second.
    #[default]
    LivingRoom,
    /// Bedroom, one target per sensor.
    Bedroom,
    /// Office, every slot tracking.
    Office,
    /// Default identity with 32 samples.
    Minimal,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LivingRoom => write!(f, "living-room"),
            Self::Bedroom => write!(f, "bedroom"),
            Self::Office => write!(f, "office"),
            Self::Minimal => write!(f, "minimal"),
        }
    }
}

/// Build a live target from a bearing in degrees.
#[must_use]
pub fn target(
    x_mm: i16,
    y_mm: i16,
    dist_mm: u16,
    speed_cms: i16,
    angle_deg: f64,
    track_id: u16,
) -> RadarTarget {
    RadarTarget {
        x_mm,
        y_mm,
        dist_mm,
        speed_cms,
        angle_deg_x10: RadarTarget::angle_x10_from_deg(angle_deg),
        track_id,
        valid: true,
    }
}

const DEFAULT_MAC: [u8; MAC_LEN] = [0xF0, 0xF5, 0xBD, 0x01, 0x56, 0x01];

/// Builder for one sample packet.
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    fields: PacketFields,
    csi_len: u16,
    seed: u64,
    timestamp_ms: Option<u64>,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new(Preset::default())
    }
}

impl FixtureBuilder {
    /// Start from a preset.
    #[must_use]
    pub fn new(preset: Preset) -> Self {
        let mut fields = PacketFields {
            rx_mac: DEFAULT_MAC,
            room_id: Room::LivingRoom.id(),
            building_id: Building::MainOffice.id(),
            seq_number: 1,
            csi_counter: 1,
            rssi: -45,
            channel: 6,
            group0: vec![
                target(1200, 800, 1442, 15, 33.7, 1),
                target(-500, 1500, 1581, -8, -18.4, 2),
            ],
            group1: vec![target(900, 600, 1081, 12, 28.8, 3)],
            ..PacketFields::default()
        };

        let csi_len = match preset {
            Preset::LivingRoom => {
                fields.csi_counter = 100;
                fields.rssi = -42;
                128
            }
            Preset::Bedroom => {
                fields.rx_mac = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
                fields.room_id = Room::Bedroom.id();
                fields.building_id = Building::Residence1.id();
                fields.seq_number = 50;
                fields.csi_counter = 500;
                fields.rssi = -38;
                fields.channel = 11;
                fields.group0 = vec![target(800, 1200, 1442, 20, 56.3, 5)];
                fields.group1 = vec![target(750, 1100, 1323, 18, 55.7, 6)];
                256
            }
            Preset::Office => {
                fields.rx_mac = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
                fields.room_id = Room::Office.id();
                fields.building_id = Building::BuildingA.id();
                fields.seq_number = 999;
                fields.csi_counter = 10_000;
                fields.rssi = -50;
                fields.channel = 1;
                fields.group0 = vec![
                    target(1500, 500, 1581, 25, 18.4, 10),
                    target(-800, 1000, 1281, -10, -38.7, 11),
                    target(200, 2000, 2010, 5, 5.7, 12),
                ];
                fields.group1 = vec![
                    target(1400, 600, 1523, 22, 23.2, 13),
                    target(-750, 950, 1211, -8, -38.3, 14),
                    target(250, 1900, 1916, 4, 7.5, 15),
                ];
                64
            }
            Preset::Minimal => 32,
        };

        Self {
            fields,
            csi_len,
            seed: 0,
            timestamp_ms: None,
        }
    }

    /// Number of CSI samples to generate.
    #[must_use]
    pub fn csi_len(mut self, csi_len: u16) -> Self {
        self.csi_len = csi_len;
        self
    }

    /// Seed for the CSI noise.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fix the timestamp instead of taking the current time at build.
    #[must_use]
    pub fn timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Override the receiver address.
    #[must_use]
    pub fn rx_mac(mut self, rx_mac: [u8; MAC_LEN]) -> Self {
        self.fields.rx_mac = rx_mac;
        self
    }

    /// Override the room.
    #[must_use]
    pub fn room(mut self, room: Room) -> Self {
        self.fields.room_id = room.id();
        self
    }

    /// Override the building.
    #[must_use]
    pub fn building(mut self, building: Building) -> Self {
        self.fields.building_id = building.id();
        self
    }

    /// Override the sequence number.
    #[must_use]
    pub fn seq_number(mut self, seq_number: u32) -> Self {
        self.fields.seq_number = seq_number;
        self
    }

    /// Override the CSI callback counter.
    #[must_use]
    pub fn csi_counter(mut self, csi_counter: u32) -> Self {
        self.fields.csi_counter = csi_counter;
        self
    }

    /// Override the signal strength.
    #[must_use]
    pub fn rssi(mut self, rssi: i8) -> Self {
        self.fields.rssi = rssi;
        self
    }

    /// Override the Wi-Fi channel.
    #[must_use]
    pub fn channel(mut self, channel: u8) -> Self {
        self.fields.channel = channel;
        self
    }

    /// Replace the targets of one sensor group (`0` or `1`).
    ///
    /// Any other group index is ignored.
    #[must_use]
    pub fn targets(mut self, sensor: usize, targets: Vec<RadarTarget>) -> Self {
        match sensor {
            0 => self.fields.group0 = targets,
            1 => self.fields.group1 = targets,
            _ => {}
        }
        self
    }

    /// Resolve the field values, generating the CSI samples.
    #[must_use]
    pub fn fields(&self) -> PacketFields {
        let timestamp_ms = self
            .timestamp_ms
            .unwrap_or_else(|| u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0));
        PacketFields {
            timestamp_ms,
            csi_data: noise(self.seed, self.csi_len),
            ..self.fields.clone()
        }
    }

    /// Encode the packet.
    ///
    /// # Errors
    ///
    /// Returns an encode error if a target group was given more than three
    /// targets.
    pub fn build(&self) -> Result<Vec<u8>> {
        let bytes = encode(&self.fields())?;
        debug!(
            seq_number = self.fields.seq_number,
            csi_len = self.csi_len,
            seed = self.seed,
            bytes = bytes.len(),
            "Built fixture packet"
        );
        Ok(bytes)
    }
}

/// Deterministic CSI noise for `seed`.
#[must_use]
pub fn noise(seed: u64, csi_len: u16) -> Vec<CsiSample> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NOISE_CONTEXT);
    hasher.update(&seed.to_le_bytes());
    let mut reader = hasher.finalize_xof();

    let mut raw = vec![0u8; usize::from(csi_len) * 2];
    reader.fill(&mut raw);

    raw.chunks_exact(2)
        .map(|pair| CsiSample::new(centered(pair[0], I_SPAN), centered(pair[1], Q_SPAN)))
        .collect()
}

/// Map a byte onto `[-span / 2, span / 2 - 1]`.
fn centered(byte: u8, span: u8) -> i8 {
    let offset = i8::try_from(byte % span).unwrap_or(0);
    let half = i8::try_from(span / 2).unwrap_or(0);
    offset - half
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::validate::validate;
    use crate::wire::format_mac;

    #[test]
    fn test_living_room_preset() {
        let bytes = FixtureBuilder::new(Preset::LivingRoom)
            .timestamp_ms(1_700_000_000_000)
            .build()
            .unwrap();
        assert_eq!(bytes.len(), 114 + 2 * 128);
        assert!(validate(&bytes).is_ok());

        let packet = decode(&bytes).unwrap();
        assert_eq!(packet.rx_mac, "F0:F5:BD:01:56:01");
        assert_eq!(packet.room_id, 1);
        assert_eq!(packet.building_id, 0);
        assert_eq!(packet.seq_number, 1);
        assert_eq!(packet.csi_counter, 100);
        assert_eq!(packet.rssi, -42);
        assert_eq!(packet.channel, 6);
        assert_eq!(packet.timestamp_ms, 1_700_000_000_000);
        assert_eq!(packet.radar_targets.group0[0].angle_deg_x10, 337);
        assert_eq!(packet.radar_targets.group0[1].angle_deg_x10, -184);
        assert_eq!(packet.valid_targets().count(), 3);
    }

    #[test]
    fn test_other_presets() {
        let bedroom = decode(&FixtureBuilder::new(Preset::Bedroom).build().unwrap()).unwrap();
        assert_eq!(bedroom.rx_mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(Building::from_id(bedroom.building_id), Some(Building::Residence1));
        assert_eq!(bedroom.csi_len, 256);
        assert_eq!(bedroom.valid_targets().count(), 2);

        let office = decode(&FixtureBuilder::new(Preset::Office).build().unwrap()).unwrap();
        assert_eq!(office.seq_number, 999);
        assert_eq!(office.csi_counter, 10_000);
        assert_eq!(office.csi_len, 64);
        assert_eq!(office.valid_targets().count(), 6);
        assert_eq!(office.radar_targets.group1[1].angle_deg_x10, -383);

        let minimal = decode(&FixtureBuilder::new(Preset::Minimal).build().unwrap()).unwrap();
        assert_eq!(minimal.csi_len, 32);
        assert_eq!(minimal.csi_counter, 1);
        assert_eq!(minimal.rssi, -45);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = noise(7, 512);
        assert_eq!(a, noise(7, 512));
        assert_ne!(a, noise(8, 512));
        assert!(a.iter().all(|s| (-30..=29).contains(&s.i)));
        assert!(a.iter().all(|s| (-20..=19).contains(&s.q)));
        assert_eq!(noise(7, 16), a[..16]);
    }

    #[test]
    fn test_builder_overrides() {
        let bytes = FixtureBuilder::default()
            .csi_len(0)
            .seq_number(42)
            .room(Room::Garage)
            .rx_mac([1, 2, 3, 4, 5, 6])
            .targets(0, Vec::new())
            .targets(1, Vec::new())
            .timestamp_ms(5)
            .build()
            .unwrap();
        assert_eq!(bytes.len(), 114);

        let packet = decode(&bytes).unwrap();
        assert_eq!(packet.seq_number, 42);
        assert_eq!(packet.room_id, Room::Garage.id());
        assert_eq!(packet.rx_mac, format_mac(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(packet.valid_targets().count(), 0);
    }

    #[test]
    fn test_too_many_targets_is_an_encode_error() {
        let err = FixtureBuilder::default()
            .targets(1, vec![RadarTarget::default(); 4])
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "encode");
    }

    #[test]
    fn test_csi_len_bounded_by_packet_length() {
        let bytes = FixtureBuilder::default()
            .csi_len(crate::wire::MAX_CSI_LEN)
            .build()
            .unwrap();
        assert!(validate(&bytes).is_ok());

        let err = FixtureBuilder::default().csi_len(40_000).build().unwrap_err();
        assert_eq!(err.code(), "encode");
    }

    #[test]
    fn test_preset_display_matches_cli_names() {
        for preset in Preset::value_variants() {
            let name = preset.to_possible_value().unwrap();
            assert_eq!(name.get_name(), preset.to_string());
        }
    }
}
