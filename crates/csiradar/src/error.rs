//! Error types for csiradar.
//!
//! Every failure produced while recognizing, decoding or checking a packet is a
//! variant of [`Error`]. Callers branch on [`Error::kind`] (structural, semantic,
//! consistency, ...) or on the stable [`Error::code`] instead of parsing
//! messages.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The bytes do not form a packet of this protocol.
    Structural,
    /// The bytes decode, but the values are logically invalid.
    Semantic,
    /// Cross-field length bookkeeping disagrees.
    Consistency,
    /// Configuration could not be loaded or is invalid.
    Config,
    /// File system failure.
    Io,
    /// JSON encoding or decoding failed.
    Serialization,
    /// Field values cannot be represented on the wire.
    Encode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => write!(f, "structural"),
            Self::Semantic => write!(f, "semantic"),
            Self::Consistency => write!(f, "consistency"),
            Self::Config => write!(f, "config"),
            Self::Io => write!(f, "io"),
            Self::Serialization => write!(f, "serialization"),
            Self::Encode => write!(f, "encode"),
        }
    }
}

/// A single field that failed semantic validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Path of the offending field, e.g. `radar_targets[1].targets[2].x_mm`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldViolation {
    /// Create a new violation.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The main error type for csiradar operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Structural Errors ===
    /// The buffer cannot even hold the fixed header.
    #[error("buffer too small: {actual} bytes (minimum {minimum} bytes for header)")]
    BufferTooSmall {
        /// Length of the buffer that was supplied.
        actual: usize,
        /// Fixed header size.
        minimum: usize,
    },

    /// The leading sentinel is not the protocol magic.
    #[error("invalid magic number: 0x{actual:X} (expected 0x{expected:X})")]
    InvalidMagic {
        /// The value that was read.
        actual: u32,
        /// The protocol magic.
        expected: u32,
    },

    /// The declared packet length differs from the buffer length.
    #[error("buffer size mismatch: {actual} bytes, expected {declared} bytes")]
    BufferSizeMismatch {
        /// Length of the buffer that was supplied.
        actual: usize,
        /// Value of the `packet_length` field.
        declared: u16,
    },

    /// The declared packet length is shorter than the fixed header.
    #[error("invalid packet length: {declared} (must be at least {minimum} bytes)")]
    InvalidPacketLength {
        /// Value of the `packet_length` field.
        declared: u16,
        /// Fixed header size.
        minimum: usize,
    },

    /// `csi_len` does not account for exactly the bytes in the buffer.
    #[error(
        "csi length mismatch: csi_len {csi_len} implies {expected} bytes, buffer has {actual} bytes"
    )]
    CsiLengthMismatch {
        /// Value of the `csi_len` field.
        csi_len: u16,
        /// `HEADER_SIZE + 2 * csi_len`.
        expected: usize,
        /// Length of the buffer that was supplied.
        actual: usize,
    },

    /// Field values cannot be laid out in a packet.
    #[error("cannot encode packet: {message}")]
    Encode {
        /// Which limit was exceeded.
        message: String,
    },

    // === Semantic Errors ===
    /// One or more fields hold logically invalid values.
    #[error("semantic validation failed: {}", join_violations(.violations))]
    Semantic {
        /// Every violated field, in field order.
        violations: Vec<FieldViolation>,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a packet file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a generated packet.
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// Path that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for csiradar operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a semantic error from a list of violations.
    #[must_use]
    pub fn semantic(violations: Vec<FieldViolation>) -> Self {
        Self::Semantic { violations }
    }

    /// Create an encode error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// The broad class this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BufferTooSmall { .. }
            | Self::InvalidMagic { .. }
            | Self::BufferSizeMismatch { .. }
            | Self::InvalidPacketLength { .. }
            | Self::CsiLengthMismatch { .. } => ErrorKind::Structural,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Semantic { .. } => ErrorKind::Semantic,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Config,
            Self::Io(_) | Self::FileRead { .. } | Self::FileWrite { .. } => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Serialization,
        }
    }

    /// A stable, machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BufferTooSmall { .. } => "buffer_too_small",
            Self::InvalidMagic { .. } => "invalid_magic",
            Self::BufferSizeMismatch { .. } => "buffer_size_mismatch",
            Self::InvalidPacketLength { .. } => "invalid_packet_length",
            Self::CsiLengthMismatch { .. } => "csi_length_mismatch",
            Self::Encode { .. } => "encode",
            Self::Semantic { .. } => "semantic_validation",
            Self::ConfigLoad(_) => "config_load",
            Self::ConfigValidation { .. } => "config_validation",
            Self::Io(_) => "io",
            Self::FileRead { .. } => "file_read",
            Self::FileWrite { .. } => "file_write",
            Self::Json(_) => "json",
        }
    }

    /// Check if the bytes themselves were rejected.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }

    /// Check if the decoded values were rejected.
    #[must_use]
    pub fn is_semantic(&self) -> bool {
        self.kind() == ErrorKind::Semantic
    }

    /// The field violations of a semantic error; empty for any other kind.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Semantic { violations } => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_too_small_display() {
        let err = Error::BufferTooSmall {
            actual: 10,
            minimum: 114,
        };
        assert_eq!(
            err.to_string(),
            "buffer too small: 10 bytes (minimum 114 bytes for header)"
        );
        assert_eq!(err.code(), "buffer_too_small");
    }

    #[test]
    fn test_invalid_magic_display_is_uppercase_hex() {
        let err = Error::InvalidMagic {
            actual: 0xcafe_babe,
            expected: 0xDEAD_BEEF,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("invalid magic number"));
        assert!(msg.contains("0xCAFEBABE"));
        assert!(msg.contains("0xDEADBEEF"));
    }

    #[test]
    fn test_buffer_size_mismatch_display() {
        let err = Error::BufferSizeMismatch {
            actual: 114,
            declared: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("buffer size mismatch"));
        assert!(msg.contains("114"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_structural_kinds() {
        let errors = [
            Error::BufferTooSmall {
                actual: 0,
                minimum: 114,
            },
            Error::InvalidMagic {
                actual: 0,
                expected: 0xDEAD_BEEF,
            },
            Error::BufferSizeMismatch {
                actual: 114,
                declared: 100,
            },
            Error::InvalidPacketLength {
                declared: 100,
                minimum: 114,
            },
            Error::CsiLengthMismatch {
                csi_len: 1,
                expected: 116,
                actual: 114,
            },
        ];
        for err in &errors {
            assert!(err.is_structural(), "{err} should be structural");
            assert!(!err.is_semantic());
            assert!(err.violations().is_empty());
        }
    }

    #[test]
    fn test_semantic_error_lists_every_violation() {
        let err = Error::semantic(vec![
            FieldViolation::new("rx_mac", "not a MAC address"),
            FieldViolation::new("packet_length", "must be positive"),
        ]);
        assert!(err.is_semantic());
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.violations().len(), 2);
        let msg = err.to_string();
        assert!(msg.contains("rx_mac: not a MAC address"));
        assert!(msg.contains("packet_length: must be positive"));
    }

    #[test]
    fn test_encode_error() {
        let err = Error::encode("too many samples");
        assert_eq!(err.to_string(), "cannot encode packet: too many samples");
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert!(!err.is_structural());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Structural.to_string(), "structural");
        assert_eq!(ErrorKind::Consistency.to_string(), "consistency");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
            assert_eq!(err.code(), "json");
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "csi_len out of range".to_string(),
        };
        assert!(err.to_string().contains("csi_len out of range"));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_file_read_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::FileRead {
            path: PathBuf::from("/root/packet.bin"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/packet.bin"));
        assert_eq!(err.code(), "file_read");
    }
}
