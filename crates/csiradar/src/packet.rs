//! Decoded packet records.
//!
//! These are the values handed to persistence collaborators once a buffer has
//! passed every check. They are plain data: built once by the decoder (or by
//! a caller preparing an encode), never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::wire::{self, TARGETS_PER_GROUP};

/// One object tracked by a radar sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RadarTarget {
    /// Lateral offset in millimeters.
    pub x_mm: i16,
    /// Forward offset in millimeters.
    pub y_mm: i16,
    /// Distance from the sensor in millimeters.
    pub dist_mm: u16,
    /// Radial speed in cm/s.
    pub speed_cms: i16,
    /// Bearing in tenths of a degree.
    pub angle_deg_x10: i16,
    /// Identifier assigned by the sensor's tracker.
    pub track_id: u16,
    /// Whether the sensor reported this slot as a live track.
    pub valid: bool,
}

impl RadarTarget {
    /// Bearing in degrees.
    #[must_use]
    pub fn angle_deg(&self) -> f64 {
        f64::from(self.angle_deg_x10) / 10.0
    }

    /// Scale a bearing in degrees to the wire's tenths, rounding to nearest.
    ///
    /// Values outside the `i16` range saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn angle_x10_from_deg(angle_deg: f64) -> i16 {
        (angle_deg * 10.0)
            .round()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
    }

    /// Interpret the raw flag byte as firmware does: only `1` is valid.
    #[must_use]
    pub fn is_valid_flag(flag: u8) -> bool {
        flag == wire::TARGET_VALID_FLAG
    }
}

/// One complex channel-state sample.
///
/// Serialises as a two-element `[i, q]` array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i8, i8)", into = "(i8, i8)")]
pub struct CsiSample {
    /// In-phase component.
    pub i: i8,
    /// Quadrature component.
    pub q: i8,
}

impl CsiSample {
    /// Create a sample from its components.
    #[must_use]
    pub fn new(i: i8, q: i8) -> Self {
        Self { i, q }
    }

    /// Magnitude of the complex value.
    #[must_use]
    pub fn amplitude(&self) -> f64 {
        f64::from(self.i).hypot(f64::from(self.q))
    }

    /// Phase of the complex value in radians.
    #[must_use]
    pub fn phase(&self) -> f64 {
        f64::from(self.q).atan2(f64::from(self.i))
    }
}

impl From<(i8, i8)> for CsiSample {
    fn from((i, q): (i8, i8)) -> Self {
        Self { i, q }
    }
}

impl From<CsiSample> for (i8, i8) {
    fn from(sample: CsiSample) -> Self {
        (sample.i, sample.q)
    }
}

/// Targets of one radar sensor. Always three slots.
pub type TargetGroup = [RadarTarget; TARGETS_PER_GROUP];

/// The two fixed sensor groups carried by every packet.
///
/// Group 0 is the first radar sensor, group 1 the second. On the JSON side
/// this keeps the collaborator-facing shape `[{"0": [...]}, {"1": [...]}]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RadarTargets {
    /// First radar sensor.
    pub group0: TargetGroup,
    /// Second radar sensor.
    pub group1: TargetGroup,
}

impl RadarTargets {
    /// Build from both groups.
    #[must_use]
    pub fn new(group0: TargetGroup, group1: TargetGroup) -> Self {
        Self { group0, group1 }
    }

    /// Look up a group by sensor index (0 or 1).
    #[must_use]
    pub fn group(&self, sensor: usize) -> Option<&TargetGroup> {
        match sensor {
            0 => Some(&self.group0),
            1 => Some(&self.group1),
            _ => None,
        }
    }

    /// Both groups in wire order.
    #[must_use]
    pub fn groups(&self) -> [&TargetGroup; 2] {
        [&self.group0, &self.group1]
    }

    /// All six targets in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &RadarTarget> {
        self.group0.iter().chain(self.group1.iter())
    }
}

#[derive(Serialize, Deserialize)]
struct SensorEntry<'a> {
    #[serde(rename = "0", skip_serializing_if = "Option::is_none", default)]
    group0: Option<std::borrow::Cow<'a, [RadarTarget]>>,
    #[serde(rename = "1", skip_serializing_if = "Option::is_none", default)]
    group1: Option<std::borrow::Cow<'a, [RadarTarget]>>,
}

impl Serialize for RadarTargets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&SensorEntry {
            group0: Some(self.group0[..].into()),
            group1: None,
        })?;
        seq.serialize_element(&SensorEntry {
            group0: None,
            group1: Some(self.group1[..].into()),
        })?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RadarTargets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let entries: Vec<SensorEntry<'static>> = Vec::deserialize(deserializer)?;
        let mut group0 = None;
        let mut group1 = None;
        for entry in entries {
            if let Some(targets) = entry.group0 {
                group0 = Some(targets);
            }
            if let Some(targets) = entry.group1 {
                group1 = Some(targets);
            }
        }

        let to_group = |targets: Option<std::borrow::Cow<'static, [RadarTarget]>>,
                        name: &str|
         -> Result<TargetGroup, D::Error> {
            let targets = targets
                .ok_or_else(|| D::Error::custom(format!("missing sensor group {name}")))?;
            TargetGroup::try_from(&*targets).map_err(|_| {
                D::Error::custom(format!(
                    "sensor group {name} must hold {TARGETS_PER_GROUP} targets, got {}",
                    targets.len()
                ))
            })
        };

        Ok(Self {
            group0: to_group(group0, "0")?,
            group1: to_group(group1, "1")?,
        })
    }
}

/// One decoded telemetry packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadarPacket {
    /// Leading sentinel, always [`wire::MAGIC`] for accepted packets.
    pub magic: u32,
    /// Protocol version tag.
    pub version: u8,
    /// Unused; carried through verbatim.
    pub reserved1: u8,
    /// Declared total length of the packet in bytes.
    pub packet_length: u16,
    /// Receiver hardware address, `XX:XX:XX:XX:XX:XX`.
    pub rx_mac: String,
    /// Application-defined room identifier.
    pub room_id: u8,
    /// Application-defined building identifier.
    pub building_id: u8,
    /// Device sequence number.
    pub seq_number: u64,
    /// Device CSI callback counter.
    pub csi_counter: u64,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Received signal strength in dBm.
    pub rssi: i8,
    /// Wi-Fi channel.
    pub channel: u8,
    /// Number of CSI samples that follow the header.
    pub csi_len: u16,
    /// Both radar sensor groups.
    pub radar_targets: RadarTargets,
    /// CSI samples in subcarrier order.
    pub csi_data: Vec<CsiSample>,
}

impl RadarPacket {
    /// Capture time as a UTC datetime, if representable.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Targets flagged valid, across both groups, tagged with their sensor.
    pub fn valid_targets(&self) -> impl Iterator<Item = (usize, &RadarTarget)> {
        self.radar_targets
            .groups()
            .into_iter()
            .enumerate()
            .flat_map(|(sensor, group)| group.iter().map(move |t| (sensor, t)))
            .filter(|(_, t)| t.valid)
    }

    /// The receiver address as raw bytes, if it is well formed.
    #[must_use]
    pub fn rx_mac_bytes(&self) -> Option<[u8; wire::MAC_LEN]> {
        wire::parse_mac(&self.rx_mac)
    }

    /// Length this packet occupies on the wire, derived from `csi_len`.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        wire::packet_len_for(self.csi_len)
    }
}
