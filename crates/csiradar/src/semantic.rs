//! Semantic validation of decoded records.
//!
//! Unlike [`crate::validate`], which stops at the first structural problem,
//! everything here is exhaustive: every violated field is collected so a caller
//! can report a complete diagnostic in one pass.
//!
//! Two entry points:
//! - [`check`] for a typed [`RadarPacket`], where the integer widths are
//!   already enforced by the types and only formats and cross-field rules
//!   remain;
//! - [`check_value`] for a record that arrives as JSON (for instance read
//!   back from persistence), where every range has to be verified by hand.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Error, FieldViolation, Result};
use crate::packet::{CsiSample, RadarPacket, RadarTarget, RadarTargets, TargetGroup};
use crate::wire::{MAGIC, TARGETS_PER_GROUP};

/// Canonical colon-separated hardware address, either hex case.
pub const MAC_PATTERN: &str = r"^(?i)([0-9A-F]{2}:){5}[0-9A-F]{2}$";

fn mac_regex() -> &'static Regex {
    static MAC: OnceLock<Regex> = OnceLock::new();
    MAC.get_or_init(|| Regex::new(MAC_PATTERN).expect("MAC_PATTERN is a valid regex"))
}

/// Check whether `s` is a canonical hardware address.
#[must_use]
pub fn is_mac(s: &str) -> bool {
    mac_regex().is_match(s)
}

/// Validate a decoded packet.
///
/// # Errors
///
/// Returns [`Error::Semantic`] listing every violated field.
pub fn check(packet: &RadarPacket) -> Result<()> {
    let found = violations(packet);
    if found.is_empty() {
        trace!(seq_number = packet.seq_number, "Semantic check passed");
        Ok(())
    } else {
        Err(Error::semantic(found))
    }
}

/// Every rule a typed packet breaks, in field order.
#[must_use]
pub fn violations(packet: &RadarPacket) -> Vec<FieldViolation> {
    let mut out = Vec::new();
    out.extend(magic_violation(packet.magic));
    out.extend(mac_violation(&packet.rx_mac));
    out.extend(cross_field_violations(packet));
    out
}

fn magic_violation(magic: u32) -> Option<FieldViolation> {
    (magic != MAGIC).then(|| {
        FieldViolation::new("magic", format!("must be 0x{MAGIC:X}, got 0x{magic:X}"))
    })
}

fn mac_violation(rx_mac: &str) -> Option<FieldViolation> {
    (!is_mac(rx_mac)).then(|| {
        FieldViolation::new(
            "rx_mac",
            format!("'{rx_mac}' is not a XX:XX:XX:XX:XX:XX address"),
        )
    })
}

/// Rules on `packet_length` and on `csi_data` against `csi_len`.
///
/// `packet_length` against `csi_len` is the decoder's concern (see
/// [`crate::decode::LengthPolicy`]), not checked here.
fn cross_field_violations(packet: &RadarPacket) -> Vec<FieldViolation> {
    let mut out = Vec::new();

    if packet.packet_length == 0 {
        out.push(FieldViolation::new("packet_length", "must be positive"));
    }
    if packet.csi_data.len() != usize::from(packet.csi_len) {
        out.push(FieldViolation::new(
            "csi_data",
            format!(
                "holds {} samples but csi_len is {}",
                packet.csi_data.len(),
                packet.csi_len
            ),
        ));
    }

    out
}

/// Validate a JSON record and build the packet it describes.
///
/// Counters (`seq_number`, `csi_counter`, `timestamp_ms`) may be given as
/// numbers or as decimal strings, since 64-bit values do not survive every
/// JSON consumer.
///
/// # Errors
///
/// Returns [`Error::Semantic`] listing every violated field, including the
/// cross-field rules of [`check`].
pub fn check_value(value: &Value) -> Result<RadarPacket> {
    let mut c = Collector::default();

    let Some(obj) = value.as_object() else {
        return Err(Error::semantic(vec![FieldViolation::new(
            "$",
            "must be an object",
        )]));
    };

    let magic = c.int::<u32>(obj, "magic", Wide::No);
    if let Some(magic) = magic {
        c.violations.extend(magic_violation(magic));
    }
    let version = c.int::<u8>(obj, "version", Wide::No);
    let reserved1 = c.int::<u8>(obj, "reserved1", Wide::No);
    let packet_length = c.int::<u16>(obj, "packet_length", Wide::No);
    let rx_mac = c.string(obj, "rx_mac");
    if let Some(rx_mac) = &rx_mac {
        c.violations.extend(mac_violation(rx_mac));
    }
    let room_id = c.int::<u8>(obj, "room_id", Wide::No);
    let building_id = c.int::<u8>(obj, "building_id", Wide::No);
    let seq_number = c.int::<u64>(obj, "seq_number", Wide::Yes);
    let csi_counter = c.int::<u64>(obj, "csi_counter", Wide::Yes);
    let timestamp_ms = c.int::<u64>(obj, "timestamp_ms", Wide::Yes);
    let rssi = c.int::<i8>(obj, "rssi", Wide::No);
    let channel = c.int::<u8>(obj, "channel", Wide::No);
    let csi_len = c.int::<u16>(obj, "csi_len", Wide::No);
    let radar_targets = c.radar_targets(obj.get("radar_targets"));
    let csi_data = c.csi_data(obj.get("csi_data"));

    let assemble = move || {
        Some(RadarPacket {
            magic: magic?,
            version: version?,
            reserved1: reserved1?,
            packet_length: packet_length?,
            rx_mac: rx_mac?,
            room_id: room_id?,
            building_id: building_id?,
            seq_number: seq_number?,
            csi_counter: csi_counter?,
            timestamp_ms: timestamp_ms?,
            rssi: rssi?,
            channel: channel?,
            csi_len: csi_len?,
            radar_targets: radar_targets?,
            csi_data: csi_data?,
        })
    };

    let mut all = c.violations;
    match assemble() {
        Some(packet) => {
            all.extend(cross_field_violations(&packet));
            if all.is_empty() {
                Ok(packet)
            } else {
                Err(Error::semantic(all))
            }
        }
        None => Err(Error::semantic(all)),
    }
}

/// Whether a field may carry its integer as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wide {
    Yes,
    No,
}

#[derive(Debug, Default)]
struct Collector {
    violations: Vec<FieldViolation>,
}

/// Integer types a JSON field can be narrowed to, with their bounds.
trait Bounded: TryFrom<i128> + Copy {
    const MIN: i128;
    const MAX: i128;
}

macro_rules! bounded {
    ($($t:ty),*) => {
        $(impl Bounded for $t {
            const MIN: i128 = <$t>::MIN as i128;
            const MAX: i128 = <$t>::MAX as i128;
        })*
    };
}

bounded!(i8, u8, i16, u16, u32, u64);

impl Collector {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    fn int<T: Bounded>(&mut self, obj: &Map<String, Value>, field: &str, wide: Wide) -> Option<T> {
        self.int_at(obj.get(field), field, wide)
    }

    fn int_at<T: Bounded>(&mut self, value: Option<&Value>, field: &str, wide: Wide) -> Option<T> {
        let Some(value) = value else {
            self.push(field, "is required");
            return None;
        };
        let number = match value {
            Value::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from)),
            Value::String(s) if wide == Wide::Yes => s.parse::<i128>().ok(),
            _ => None,
        };
        let in_range = number.filter(|n| (T::MIN..=T::MAX).contains(n));
        match in_range.and_then(|n| T::try_from(n).ok()) {
            Some(v) => Some(v),
            None => {
                self.push(
                    field,
                    format!("must be an integer in [{}, {}], got {value}", T::MIN, T::MAX),
                );
                None
            }
        }
    }

    fn string(&mut self, obj: &Map<String, Value>, field: &str) -> Option<String> {
        match obj.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.push(field, format!("must be a string, got {other}"));
                None
            }
            None => {
                self.push(field, "is required");
                None
            }
        }
    }

    fn radar_targets(&mut self, value: Option<&Value>) -> Option<RadarTargets> {
        let Some(entries) = value.and_then(Value::as_array) else {
            self.push("radar_targets", "must be an array of sensor groups");
            return None;
        };

        let mut groups: [Option<TargetGroup>; 2] = [None, None];
        let mut seen = [false; 2];
        let mut ok = true;
        for (index, entry) in entries.iter().enumerate() {
            let Some(map) = entry.as_object() else {
                self.push(format!("radar_targets[{index}]"), "must be an object");
                ok = false;
                continue;
            };
            for (key, targets) in map {
                let path = format!("radar_targets.{key}");
                let sensor = match key.as_str() {
                    "0" => 0,
                    "1" => 1,
                    _ => {
                        self.push(path, "unknown sensor group (expected \"0\" or \"1\")");
                        ok = false;
                        continue;
                    }
                };
                if seen[sensor] {
                    self.push(path, "duplicate sensor group");
                    ok = false;
                    continue;
                }
                seen[sensor] = true;
                match self.group(targets, &path) {
                    Some(group) => groups[sensor] = Some(group),
                    None => ok = false,
                }
            }
        }

        for (sensor, seen) in seen.into_iter().enumerate() {
            if !seen {
                self.push(format!("radar_targets.{sensor}"), "sensor group is missing");
            }
        }

        match groups {
            [Some(group0), Some(group1)] if ok => Some(RadarTargets::new(group0, group1)),
            _ => None,
        }
    }

    fn group(&mut self, value: &Value, path: &str) -> Option<TargetGroup> {
        let Some(items) = value.as_array() else {
            self.push(path, "must be an array of targets");
            return None;
        };
        if items.len() != TARGETS_PER_GROUP {
            self.push(
                path,
                format!("must hold {TARGETS_PER_GROUP} targets, got {}", items.len()),
            );
        }

        let mut group = TargetGroup::default();
        let mut ok = items.len() == TARGETS_PER_GROUP;
        for (index, item) in items.iter().enumerate() {
            match self.target(item, &format!("{path}[{index}]")) {
                Some(target) if index < TARGETS_PER_GROUP => group[index] = target,
                Some(_) => {}
                None => ok = false,
            }
        }
        ok.then_some(group)
    }

    fn target(&mut self, value: &Value, path: &str) -> Option<RadarTarget> {
        let Some(obj) = value.as_object() else {
            self.push(path, "must be a target object");
            return None;
        };
        let field = |name: &str| format!("{path}.{name}");

        let x_mm = self.int_at::<i16>(obj.get("x_mm"), &field("x_mm"), Wide::No);
        let y_mm = self.int_at::<i16>(obj.get("y_mm"), &field("y_mm"), Wide::No);
        let dist_mm = self.int_at::<u16>(obj.get("dist_mm"), &field("dist_mm"), Wide::No);
        let speed_cms = self.int_at::<i16>(obj.get("speed_cms"), &field("speed_cms"), Wide::No);
        let angle_deg_x10 =
            self.int_at::<i16>(obj.get("angle_deg_x10"), &field("angle_deg_x10"), Wide::No);
        let track_id = self.int_at::<u16>(obj.get("track_id"), &field("track_id"), Wide::No);
        let valid = match obj.get("valid") {
            Some(Value::Bool(b)) => Some(*b),
            other => {
                let got = other.map_or_else(|| "nothing".to_string(), ToString::to_string);
                self.push(field("valid"), format!("must be a boolean, got {got}"));
                None
            }
        };

        Some(RadarTarget {
            x_mm: x_mm?,
            y_mm: y_mm?,
            dist_mm: dist_mm?,
            speed_cms: speed_cms?,
            angle_deg_x10: angle_deg_x10?,
            track_id: track_id?,
            valid: valid?,
        })
    }

    fn csi_data(&mut self, value: Option<&Value>) -> Option<Vec<CsiSample>> {
        let Some(items) = value.and_then(Value::as_array) else {
            self.push("csi_data", "must be an array of [i, q] pairs");
            return None;
        };

        let mut samples = Vec::with_capacity(items.len());
        let mut ok = true;
        for (index, item) in items.iter().enumerate() {
            let path = format!("csi_data[{index}]");
            match item.as_array().map(Vec::as_slice) {
                Some([i, q]) => {
                    let i = self.int_at::<i8>(Some(i), &format!("{path}[0]"), Wide::No);
                    let q = self.int_at::<i8>(Some(q), &format!("{path}[1]"), Wide::No);
                    match (i, q) {
                        (Some(i), Some(q)) => samples.push(CsiSample::new(i, q)),
                        _ => ok = false,
                    }
                }
                _ => {
                    self.push(path, format!("must be an [i, q] pair, got {item}"));
                    ok = false;
                }
            }
        }
        ok.then_some(samples)
    }
}
