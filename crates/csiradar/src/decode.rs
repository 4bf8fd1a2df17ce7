//! Packet decoder.
//!
//! Reads a buffer that already passed [`crate::validate::validate`] into a
//! [`RadarPacket`], one field at a time through a little-endian cursor.

use std::fmt;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::packet::{CsiSample, RadarPacket, RadarTarget, RadarTargets, TargetGroup};
use crate::wire::{self, HEADER_SIZE, MAC_LEN, MAGIC};

/// How the decoder treats a `csi_len` that disagrees with the buffer length.
///
/// A `csi_len` that would read past the end of the buffer is always rejected.
/// The policy only decides what happens to unread trailing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Reject the packet with [`Error::CsiLengthMismatch`].
    #[default]
    Strict,
    /// Accept the packet and report a [`ConsistencyWarning`].
    Lenient,
}

impl fmt::Display for LengthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

/// Non-fatal disagreement between `csi_len` and the buffer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsistencyWarning {
    /// Value of the `csi_len` field.
    pub csi_len: u16,
    /// `HEADER_SIZE + 2 * csi_len`.
    pub expected: usize,
    /// Length of the buffer that was decoded.
    pub actual: usize,
}

impl ConsistencyWarning {
    /// Always [`ErrorKind::Consistency`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Consistency
    }

    /// Bytes left unread after the last declared sample.
    #[must_use]
    pub fn trailing_bytes(&self) -> usize {
        self.actual.saturating_sub(self.expected)
    }
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buffer length mismatch: received {} bytes, expected {} bytes \
             (header: {}, CSI data: {})",
            self.actual,
            self.expected,
            HEADER_SIZE,
            self.expected - HEADER_SIZE
        )
    }
}

/// A decoded packet together with any consistency warnings raised on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded record.
    pub packet: RadarPacket,
    /// Warnings accepted under [`LengthPolicy::Lenient`].
    pub warnings: Vec<ConsistencyWarning>,
}

/// Stateless packet decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decoder {
    policy: LengthPolicy,
}

impl Decoder {
    /// Create a decoder with the given length policy.
    #[must_use]
    pub fn new(policy: LengthPolicy) -> Self {
        Self { policy }
    }

    /// The length policy in effect.
    #[must_use]
    pub fn policy(&self) -> LengthPolicy {
        self.policy
    }

    /// Decode a packet, discarding warnings (they are still logged).
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode_with_warnings`].
    pub fn decode(&self, buffer: &[u8]) -> Result<RadarPacket> {
        self.decode_with_warnings(buffer).map(|decoded| decoded.packet)
    }

    /// Decode a packet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMagic`] if the buffer does not open with the
    /// protocol magic, [`Error::BufferTooSmall`] if it cannot hold the fixed
    /// header, and [`Error::CsiLengthMismatch`] if `csi_len` overruns the
    /// buffer (or, under [`LengthPolicy::Strict`], leaves bytes unread).
    pub fn decode_with_warnings(&self, buffer: &[u8]) -> Result<Decoded> {
        let len = buffer.len();
        let short = move |_: std::io::Error| Error::BufferTooSmall {
            actual: len,
            minimum: HEADER_SIZE,
        };
        let mut cursor = Cursor::new(buffer);

        let magic = cursor.read_u32::<LittleEndian>().map_err(short)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                actual: magic,
                expected: MAGIC,
            });
        }

        let version = cursor.read_u8().map_err(short)?;
        let reserved1 = cursor.read_u8().map_err(short)?;
        let packet_length = cursor.read_u16::<LittleEndian>().map_err(short)?;

        let mut mac = [0u8; MAC_LEN];
        cursor.read_exact(&mut mac).map_err(short)?;
        let rx_mac = wire::format_mac(&mac);

        let room_id = cursor.read_u8().map_err(short)?;
        let building_id = cursor.read_u8().map_err(short)?;

        let seq_number = u64::from(cursor.read_u32::<LittleEndian>().map_err(short)?);
        let csi_counter = u64::from(cursor.read_u32::<LittleEndian>().map_err(short)?);
        let timestamp_ms = cursor.read_u64::<LittleEndian>().map_err(short)?;

        let rssi = cursor.read_i8().map_err(short)?;
        let channel = cursor.read_u8().map_err(short)?;
        let csi_len = cursor.read_u16::<LittleEndian>().map_err(short)?;

        let group0 = read_group(&mut cursor).map_err(short)?;
        let group1 = read_group(&mut cursor).map_err(short)?;

        let expected = wire::packet_len_for(csi_len);
        let mut warnings = Vec::new();
        if expected != len {
            let warning = ConsistencyWarning {
                csi_len,
                expected,
                actual: len,
            };
            if expected > len || self.policy == LengthPolicy::Strict {
                return Err(Error::CsiLengthMismatch {
                    csi_len,
                    expected,
                    actual: len,
                });
            }
            warn!(
                csi_len,
                expected,
                actual = len,
                trailing = warning.trailing_bytes(),
                "{warning}"
            );
            warnings.push(warning);
        }

        let mut csi_data = Vec::with_capacity(usize::from(csi_len));
        for _ in 0..csi_len {
            let i = cursor.read_i8().map_err(short)?;
            let q = cursor.read_i8().map_err(short)?;
            csi_data.push(CsiSample::new(i, q));
        }

        debug!(
            rx_mac = %rx_mac,
            seq_number,
            csi_len,
            "Decoded radar packet"
        );

        Ok(Decoded {
            packet: RadarPacket {
                magic,
                version,
                reserved1,
                packet_length,
                rx_mac,
                room_id,
                building_id,
                seq_number,
                csi_counter,
                timestamp_ms,
                rssi,
                channel,
                csi_len,
                radar_targets: RadarTargets::new(group0, group1),
                csi_data,
            },
            warnings,
        })
    }
}

/// Decode a packet with the default (strict) length policy.
///
/// # Errors
///
/// See [`Decoder::decode_with_warnings`].
pub fn decode(buffer: &[u8]) -> Result<RadarPacket> {
    Decoder::default().decode(buffer)
}

fn read_target(cursor: &mut Cursor<&[u8]>) -> std::io::Result<RadarTarget> {
    Ok(RadarTarget {
        x_mm: cursor.read_i16::<LittleEndian>()?,
        y_mm: cursor.read_i16::<LittleEndian>()?,
        dist_mm: cursor.read_u16::<LittleEndian>()?,
        speed_cms: cursor.read_i16::<LittleEndian>()?,
        angle_deg_x10: cursor.read_i16::<LittleEndian>()?,
        track_id: cursor.read_u16::<LittleEndian>()?,
        valid: RadarTarget::is_valid_flag(cursor.read_u8()?),
    })
}

fn read_group(cursor: &mut Cursor<&[u8]>) -> std::io::Result<TargetGroup> {
    let mut group = TargetGroup::default();
    for slot in &mut group {
        *slot = read_target(cursor)?;
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, PacketFields};
    use crate::logging::init_test_logging;
    use crate::wire::{GROUP0_OFFSET, GROUP1_OFFSET, TARGET_SIZE};

    fn header(csi_len: u16) -> Vec<u8> {
        encode(&PacketFields {
            csi_data: vec![CsiSample::default(); usize::from(csi_len)],
            ..PacketFields::default()
        })
        .unwrap()
    }

    #[test]
    fn test_decode_minimal_header() {
        let packet = decode(&header(0)).unwrap();
        assert_eq!(packet.magic, MAGIC);
        assert_eq!(packet.packet_length, 114);
        assert_eq!(packet.csi_len, 0);
        assert!(packet.csi_data.is_empty());
        for group in packet.radar_targets.groups() {
            assert_eq!(group, &[RadarTarget::default(); 3]);
        }
    }

    #[test]
    fn test_decode_field_offsets() {
        let mut buf = header(1);
        buf[4] = 7; // version
        buf[5] = 9; // reserved1
        buf[8..14].copy_from_slice(&[0xF0, 0xF5, 0xBD, 0x01, 0x56, 0x01]);
        buf[14] = 3;
        buf[15] = 255;
        buf[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        buf[20..24].copy_from_slice(&0x8000_0001u32.to_le_bytes());
        buf[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        buf[32] = 0xD6; // -42
        buf[33] = 11;
        buf[114] = 0x80; // I = -128
        buf[115] = 0x7F; // Q = 127

        let packet = decode(&buf).unwrap();
        assert_eq!(packet.version, 7);
        assert_eq!(packet.reserved1, 9);
        assert_eq!(packet.rx_mac, "F0:F5:BD:01:56:01");
        assert_eq!(packet.room_id, 3);
        assert_eq!(packet.building_id, 255);
        assert_eq!(packet.seq_number, u64::from(u32::MAX));
        assert_eq!(packet.csi_counter, 0x8000_0001);
        assert_eq!(packet.timestamp_ms, u64::MAX);
        assert_eq!(packet.rssi, -42);
        assert_eq!(packet.channel, 11);
        assert_eq!(packet.csi_data, vec![CsiSample::new(-128, 127)]);
    }

    #[test]
    fn test_decode_target_signedness() {
        let mut buf = header(0);
        let t = &mut buf[GROUP1_OFFSET + TARGET_SIZE..GROUP1_OFFSET + 2 * TARGET_SIZE];
        t[0..2].copy_from_slice(&(-500i16).to_le_bytes());
        t[2..4].copy_from_slice(&1500i16.to_le_bytes());
        t[4..6].copy_from_slice(&60_000u16.to_le_bytes());
        t[6..8].copy_from_slice(&(-8i16).to_le_bytes());
        t[8..10].copy_from_slice(&(-184i16).to_le_bytes());
        t[10..12].copy_from_slice(&65_535u16.to_le_bytes());
        t[12] = 1;

        let packet = decode(&buf).unwrap();
        let target = packet.radar_targets.group1[1];
        assert_eq!(
            target,
            RadarTarget {
                x_mm: -500,
                y_mm: 1500,
                dist_mm: 60_000,
                speed_cms: -8,
                angle_deg_x10: -184,
                track_id: 65_535,
                valid: true,
            }
        );
        assert!((target.angle_deg() + 18.4).abs() < 1e-9);
        assert_eq!(packet.radar_targets.group0, [RadarTarget::default(); 3]);
    }

    #[test]
    fn test_valid_flag_values() {
        for (flag, expected) in [(0u8, false), (1, true), (2, false), (255, false)] {
            let mut buf = header(0);
            buf[GROUP0_OFFSET + TARGET_SIZE - 1] = flag;
            let packet = decode(&buf).unwrap();
            assert_eq!(packet.radar_targets.group0[0].valid, expected, "flag {flag}");
        }
    }

    #[test]
    fn test_decode_max_csi_len() {
        // Too long for packet_length, so the encoder refuses it. Build it by hand.
        let mut buf = vec![0u8; wire::packet_len_for(u16::MAX)];
        buf[..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4] = wire::PROTOCOL_VERSION;
        buf[6..8].copy_from_slice(&0xFFFFu16.to_le_bytes());
        buf[34..36].copy_from_slice(&u16::MAX.to_le_bytes());
        assert_eq!(buf.len(), 114 + 2 * 65_535);

        let packet = decode(&buf).unwrap();
        assert_eq!(packet.packet_length, u16::MAX);
        assert_eq!(packet.csi_len, u16::MAX);
        assert_eq!(packet.csi_data.len(), 65_535);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut buf = header(0);
        buf[3] = 0;
        assert!(matches!(
            decode(&buf).unwrap_err(),
            Error::InvalidMagic { .. }
        ));
    }

    #[test]
    fn test_decode_truncated_header_is_structural() {
        let buf = header(0);
        let err = decode(&buf[..50]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                actual: 50,
                minimum: 114
            }
        ));
        assert!(decode(&buf[..2]).unwrap_err().is_structural());
    }

    #[test]
    fn test_csi_len_overrun_always_rejected() {
        let mut buf = header(2);
        buf[34..36].copy_from_slice(&3u16.to_le_bytes());
        for policy in [LengthPolicy::Strict, LengthPolicy::Lenient] {
            let err = Decoder::new(policy).decode(&buf).unwrap_err();
            assert!(matches!(
                err,
                Error::CsiLengthMismatch {
                    csi_len: 3,
                    expected: 120,
                    actual: 118
                }
            ));
        }
    }

    #[test]
    fn test_trailing_bytes_strict() {
        let mut buf = header(2);
        buf[34..36].copy_from_slice(&1u16.to_le_bytes());
        let err = decode(&buf).unwrap_err();
        assert_eq!(err.code(), "csi_length_mismatch");
    }

    #[test]
    fn test_trailing_bytes_lenient() {
        init_test_logging();
        let mut buf = header(2);
        buf[34..36].copy_from_slice(&1u16.to_le_bytes());
        let decoded = Decoder::new(LengthPolicy::Lenient)
            .decode_with_warnings(&buf)
            .unwrap();
        assert_eq!(decoded.packet.csi_data.len(), 1);
        assert_eq!(decoded.warnings.len(), 1);
        let warning = decoded.warnings[0];
        assert_eq!(warning.kind(), ErrorKind::Consistency);
        assert_eq!(warning.trailing_bytes(), 2);
        assert!(warning.to_string().contains("received 118 bytes, expected 116"));
    }

    #[test]
    fn test_length_policy_serde() {
        let policy: LengthPolicy = serde_json::from_str(r#""lenient""#).unwrap();
        assert_eq!(policy, LengthPolicy::Lenient);
        assert_eq!(LengthPolicy::default(), LengthPolicy::Strict);
        assert_eq!(LengthPolicy::Strict.to_string(), "strict");
    }
}
