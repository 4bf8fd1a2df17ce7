//! Packet encoder.
//!
//! The byte-for-byte inverse of [`crate::decode`]. Firmware is the real
//! producer of these buffers; this side exists to build fixtures and to
//! re-emit decoded packets.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Error, FieldViolation, Result};
use crate::packet::{CsiSample, RadarPacket, RadarTarget};
use crate::wire::{self, MAC_LEN, MAGIC, PROTOCOL_VERSION, TARGETS_PER_GROUP};

/// Field values for one packet.
///
/// `packet_length` and `csi_len` are not supplied: both follow from
/// `csi_data`. Target slots missing from either group are filled with
/// [`RadarTarget::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFields {
    /// Protocol version tag.
    pub version: u8,
    /// Reserved byte.
    pub reserved1: u8,
    /// Receiver hardware address.
    pub rx_mac: [u8; MAC_LEN],
    /// Room identifier.
    pub room_id: u8,
    /// Building identifier.
    pub building_id: u8,
    /// Sequence number.
    pub seq_number: u32,
    /// CSI callback counter.
    pub csi_counter: u32,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Signal strength in dBm.
    pub rssi: i8,
    /// Wi-Fi channel.
    pub channel: u8,
    /// Up to three targets for the first sensor.
    pub group0: Vec<RadarTarget>,
    /// Up to three targets for the second sensor.
    pub group1: Vec<RadarTarget>,
    /// CSI samples, at most [`wire::MAX_CSI_LEN`].
    pub csi_data: Vec<CsiSample>,
}

impl Default for PacketFields {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            reserved1: 0,
            rx_mac: [0; MAC_LEN],
            room_id: 0,
            building_id: 0,
            seq_number: 0,
            csi_counter: 0,
            timestamp_ms: 0,
            rssi: 0,
            channel: 0,
            group0: Vec::new(),
            group1: Vec::new(),
            csi_data: Vec::new(),
        }
    }
}

impl TryFrom<&RadarPacket> for PacketFields {
    type Error = Error;

    /// Recover encodable fields from a decoded record.
    ///
    /// Fails if the record holds values the wire cannot carry: a malformed
    /// MAC, counters wider than 32 bits, or a `csi_len` that disagrees with
    /// `csi_data`.
    fn try_from(packet: &RadarPacket) -> Result<Self> {
        let mut violations = Vec::new();

        let rx_mac = wire::parse_mac(&packet.rx_mac).unwrap_or_else(|| {
            violations.push(FieldViolation::new(
                "rx_mac",
                format!("'{}' is not a XX:XX:XX:XX:XX:XX address", packet.rx_mac),
            ));
            [0; MAC_LEN]
        });
        let mut narrow = |field: &str, value: u64| {
            u32::try_from(value).unwrap_or_else(|_| {
                violations.push(FieldViolation::new(
                    field,
                    format!("{value} does not fit the 32-bit wire field"),
                ));
                0
            })
        };
        let seq_number = narrow("seq_number", packet.seq_number);
        let csi_counter = narrow("csi_counter", packet.csi_counter);
        if usize::from(packet.csi_len) != packet.csi_data.len() {
            violations.push(FieldViolation::new(
                "csi_len",
                format!(
                    "declares {} samples but csi_data holds {}",
                    packet.csi_len,
                    packet.csi_data.len()
                ),
            ));
        }

        if !violations.is_empty() {
            return Err(Error::semantic(violations));
        }

        Ok(Self {
            version: packet.version,
            reserved1: packet.reserved1,
            rx_mac,
            room_id: packet.room_id,
            building_id: packet.building_id,
            seq_number,
            csi_counter,
            timestamp_ms: packet.timestamp_ms,
            rssi: packet.rssi,
            channel: packet.channel,
            group0: packet.radar_targets.group0.to_vec(),
            group1: packet.radar_targets.group1.to_vec(),
            csi_data: packet.csi_data.clone(),
        })
    }
}

/// Encode a packet.
///
/// # Errors
///
/// Returns [`Error::Encode`] if a group holds more than three targets or
/// there are more than [`wire::MAX_CSI_LEN`] samples.
pub fn encode(fields: &PacketFields) -> Result<Vec<u8>> {
    let csi_len = u16::try_from(fields.csi_data.len()).map_err(|_| {
        Error::encode(format!(
            "{} CSI samples exceed the maximum of {}",
            fields.csi_data.len(),
            u16::MAX
        ))
    })?;
    for (sensor, group) in [&fields.group0, &fields.group1].into_iter().enumerate() {
        if group.len() > TARGETS_PER_GROUP {
            return Err(Error::encode(format!(
                "sensor group {sensor} has {} targets (maximum {TARGETS_PER_GROUP})",
                group.len()
            )));
        }
    }

    let total = wire::packet_len_for(csi_len);
    let packet_length = u16::try_from(total).map_err(|_| {
        Error::encode(format!(
            "{csi_len} CSI samples make a {total}-byte packet; packet_length holds at most {}",
            u16::MAX
        ))
    })?;

    let mut buf = Vec::with_capacity(total);
    buf.write_u32::<LittleEndian>(MAGIC)?;
    buf.write_u8(fields.version)?;
    buf.write_u8(fields.reserved1)?;
    buf.write_u16::<LittleEndian>(packet_length)?;
    buf.extend_from_slice(&fields.rx_mac);
    buf.write_u8(fields.room_id)?;
    buf.write_u8(fields.building_id)?;
    buf.write_u32::<LittleEndian>(fields.seq_number)?;
    buf.write_u32::<LittleEndian>(fields.csi_counter)?;
    buf.write_u64::<LittleEndian>(fields.timestamp_ms)?;
    buf.write_i8(fields.rssi)?;
    buf.write_u8(fields.channel)?;
    buf.write_u16::<LittleEndian>(csi_len)?;

    let blank = RadarTarget::default();
    for group in [&fields.group0, &fields.group1] {
        let padding = TARGETS_PER_GROUP - group.len();
        for target in group.iter().chain(std::iter::repeat(&blank).take(padding)) {
            write_target(&mut buf, target)?;
        }
    }

    for sample in &fields.csi_data {
        buf.write_i8(sample.i)?;
        buf.write_i8(sample.q)?;
    }

    debug_assert_eq!(buf.len(), total);
    Ok(buf)
}

/// Re-encode a decoded packet.
///
/// # Errors
///
/// See [`PacketFields::try_from`] and [`encode`].
pub fn encode_packet(packet: &RadarPacket) -> Result<Vec<u8>> {
    encode(&PacketFields::try_from(packet)?)
}

fn write_target(buf: &mut Vec<u8>, target: &RadarTarget) -> std::io::Result<()> {
    buf.write_i16::<LittleEndian>(target.x_mm)?;
    buf.write_i16::<LittleEndian>(target.y_mm)?;
    buf.write_u16::<LittleEndian>(target.dist_mm)?;
    buf.write_i16::<LittleEndian>(target.speed_cms)?;
    buf.write_i16::<LittleEndian>(target.angle_deg_x10)?;
    buf.write_u16::<LittleEndian>(target.track_id)?;
    buf.write_u8(u8::from(target.valid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::validate::validate;
    use crate::wire::HEADER_SIZE;

    fn tracked(track_id: u16, angle_deg: f64) -> RadarTarget {
        RadarTarget {
            x_mm: -500,
            y_mm: 1500,
            dist_mm: 1581,
            speed_cms: -8,
            angle_deg_x10: RadarTarget::angle_x10_from_deg(angle_deg),
            track_id,
            valid: true,
        }
    }

    fn fields() -> PacketFields {
        PacketFields {
            version: 3,
            reserved1: 0xAA,
            rx_mac: [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC],
            room_id: 4,
            building_id: 1,
            seq_number: u32::MAX,
            csi_counter: 10_000,
            timestamp_ms: u64::MAX - 1,
            rssi: -128,
            channel: 1,
            group0: vec![tracked(10, 18.4), tracked(11, -38.7), tracked(12, 5.7)],
            group1: vec![tracked(13, 23.2)],
            csi_data: (0..64)
                .map(|n: i8| CsiSample::new(n.wrapping_mul(3), -n))
                .collect(),
        }
    }

    #[test]
    fn test_roundtrip_preserves_every_field() {
        let fields = fields();
        let buf = encode(&fields).unwrap();
        assert!(validate(&buf).is_ok());

        let packet = decode(&buf).unwrap();
        assert_eq!(packet.magic, MAGIC);
        assert_eq!(packet.version, fields.version);
        assert_eq!(packet.reserved1, fields.reserved1);
        assert_eq!(usize::from(packet.packet_length), buf.len());
        assert_eq!(packet.rx_mac, "12:34:56:78:9A:BC");
        assert_eq!(packet.room_id, fields.room_id);
        assert_eq!(packet.building_id, fields.building_id);
        assert_eq!(packet.seq_number, u64::from(fields.seq_number));
        assert_eq!(packet.csi_counter, u64::from(fields.csi_counter));
        assert_eq!(packet.timestamp_ms, fields.timestamp_ms);
        assert_eq!(packet.rssi, fields.rssi);
        assert_eq!(packet.channel, fields.channel);
        assert_eq!(packet.csi_len, 64);
        assert_eq!(packet.radar_targets.group0.to_vec(), fields.group0);
        assert_eq!(packet.radar_targets.group1[0], fields.group1[0]);
        assert_eq!(packet.csi_data, fields.csi_data);

        // And back again.
        assert_eq!(PacketFields::try_from(&packet).unwrap(), {
            let mut padded = fields.clone();
            padded.group1.resize(3, RadarTarget::default());
            padded
        });
        assert_eq!(encode_packet(&packet).unwrap(), buf);
    }

    #[test]
    fn test_missing_targets_are_padded() {
        let buf = encode(&PacketFields::default()).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        let packet = decode(&buf).unwrap();
        assert_eq!(packet.radar_targets.group1[2], RadarTarget::default());
        assert!(packet.radar_targets.iter().all(|t| !t.valid));
    }

    #[test]
    fn test_packet_length_computed() {
        let mut fields = PacketFields::default();
        fields.csi_data = vec![CsiSample::new(1, -1); 128];
        let buf = encode(&fields).unwrap();
        assert_eq!(buf.len(), 370);
        assert_eq!(u16::from_le_bytes([buf[6], buf[7]]), 370);
        assert_eq!(u16::from_le_bytes([buf[34], buf[35]]), 128);
    }

    #[test]
    fn test_angle_stored_in_tenths() {
        let mut fields = PacketFields::default();
        fields.group0 = vec![tracked(1, 33.7)];
        let buf = encode(&fields).unwrap();
        assert_eq!(i16::from_le_bytes([buf[44], buf[45]]), 337);

        let packet = decode(&buf).unwrap();
        let angle = packet.radar_targets.group0[0].angle_deg();
        assert!((angle - 33.7).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_too_many_targets() {
        let mut fields = PacketFields::default();
        fields.group1 = vec![RadarTarget::default(); 4];
        let err = encode(&fields).unwrap_err();
        assert_eq!(err.code(), "encode");
        assert!(err.to_string().contains("sensor group 1"));
    }

    #[test]
    fn test_rejects_too_many_samples() {
        let mut fields = PacketFields::default();
        fields.csi_data = vec![CsiSample::default(); usize::from(u16::MAX) + 1];
        assert!(encode(&fields).is_err());
    }

    #[test]
    fn test_packet_length_must_fit_its_field() {
        let mut fields = PacketFields::default();
        fields.csi_data = vec![CsiSample::default(); usize::from(wire::MAX_CSI_LEN)];
        let buf = encode(&fields).unwrap();
        assert_eq!(u16::from_le_bytes([buf[6], buf[7]]), 65_534);
        assert!(validate(&buf).is_ok());

        fields.csi_data.push(CsiSample::default());
        let err = encode(&fields).unwrap_err();
        assert_eq!(err.code(), "encode");
        assert!(err.to_string().contains("packet_length"));

        fields.csi_data = vec![CsiSample::default(); 40_000];
        assert_eq!(encode(&fields).unwrap_err().code(), "encode");
    }

    #[test]
    fn test_packet_with_wide_counter_cannot_be_encoded() {
        let mut packet = decode(&encode(&fields()).unwrap()).unwrap();
        packet.seq_number = u64::from(u32::MAX) + 1;
        packet.rx_mac = "nonsense".to_string();
        let err = encode_packet(&packet).unwrap_err();
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["rx_mac", "seq_number"]);
    }
}
