//! Byte layout of a CSI/radar telemetry packet.
//!
//! All multi-byte integers are little-endian.
//!
//! ```text
//! Offset  Size       Field
//! ------  ---------  -----------------------------------
//! 0       4          magic (0xDEADBEEF)
//! 4       1          version
//! 5       1          reserved1
//! 6       2          packet_length (== total buffer length)
//! 8       6          rx_mac
//! 14      1          room_id
//! 15      1          building_id
//! 16      4          seq_number
//! 20      4          csi_counter
//! 24      8          timestamp_ms
//! 32      1          rssi (signed)
//! 33      1          channel
//! 34      2          csi_len
//! 36      39         sensor group 0 targets (3 x 13)
//! 75      39         sensor group 1 targets (3 x 13)
//! 114     2*csi_len  CSI samples (signed I, Q pairs)
//! ```

/// Sentinel that opens every packet.
pub const MAGIC: u32 = 0xDEAD_BEEF;

/// Protocol version emitted by current firmware.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the fixed header, including both target blocks.
pub const HEADER_SIZE: usize = 114;

/// Bytes per encoded radar target.
pub const TARGET_SIZE: usize = 13;

/// Targets reported per sensor group.
pub const TARGETS_PER_GROUP: usize = 3;

/// Bytes per CSI sample (one signed I byte, one signed Q byte).
pub const SAMPLE_SIZE: usize = 2;

/// Length of a hardware address.
pub const MAC_LEN: usize = 6;

/// Offset of the `packet_length` field.
pub const PACKET_LENGTH_OFFSET: usize = 6;

/// Offset of the first sensor group's target block.
pub const GROUP0_OFFSET: usize = 36;

/// Offset of the second sensor group's target block.
pub const GROUP1_OFFSET: usize = GROUP0_OFFSET + TARGETS_PER_GROUP * TARGET_SIZE;

/// Raw flag value marking a target as valid. Anything else is invalid.
pub const TARGET_VALID_FLAG: u8 = 1;

/// Largest sample count whose packet length fits the 16-bit
/// `packet_length` field.
pub const MAX_CSI_LEN: u16 = 32_710;

/// Total packet length for a given sample count.
///
/// Computed in `usize`, so it never wraps. Only counts up to
/// [`MAX_CSI_LEN`] give a length that `packet_length` can hold.
#[must_use]
pub fn packet_len_for(csi_len: u16) -> usize {
    HEADER_SIZE + SAMPLE_SIZE * usize::from(csi_len)
}

/// Render a hardware address as `XX:XX:XX:XX:XX:XX`.
#[must_use]
pub fn format_mac(bytes: &[u8; MAC_LEN]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse a colon-separated hardware address (either hex case).
///
/// Returns `None` unless the input is exactly six two-digit groups.
#[must_use]
pub fn parse_mac(s: &str) -> Option<[u8; MAC_LEN]> {
    let mut out = [0u8; MAC_LEN];
    let mut parts = s.split(':');
    for byte in &mut out {
        let part = parts.next()?;
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_adds_up() {
        let fields = 4 + 1 + 1 + 2 + MAC_LEN + 1 + 1 + 4 + 4 + 8 + 1 + 1 + 2;
        assert_eq!(fields, GROUP0_OFFSET);
        assert_eq!(GROUP1_OFFSET, 75);
        assert_eq!(GROUP1_OFFSET + TARGETS_PER_GROUP * TARGET_SIZE, HEADER_SIZE);
    }

    #[test]
    fn test_packet_len_for() {
        assert_eq!(packet_len_for(0), 114);
        assert_eq!(packet_len_for(128), 370);
        assert_eq!(packet_len_for(u16::MAX), 114 + 131_070);
    }

    #[test]
    fn test_max_csi_len_fills_packet_length() {
        assert_eq!(packet_len_for(MAX_CSI_LEN), 65_534);
        assert!(packet_len_for(MAX_CSI_LEN + 1) > usize::from(u16::MAX));
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(
            format_mac(&[0xF0, 0xF5, 0xBD, 0x01, 0x56, 0x01]),
            "F0:F5:BD:01:56:01"
        );
        assert_eq!(format_mac(&[0; 6]), "00:00:00:00:00:00");
        assert_eq!(format_mac(&[0xab; 6]).len(), 17);
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_mac("f0:f5:BD:01:56:01"),
            Some([0xF0, 0xF5, 0xBD, 0x01, 0x56, 0x01])
        );
        assert_eq!(parse_mac("F0:F5:BD:01:56"), None);
        assert_eq!(parse_mac("F0:F5:BD:01:56:01:02"), None);
        assert_eq!(parse_mac("F0:F5:BD:01:56:1"), None);
        assert_eq!(parse_mac("G0:F5:BD:01:56:01"), None);
        assert_eq!(parse_mac("+F:F5:BD:01:56:01"), None);
    }
}
