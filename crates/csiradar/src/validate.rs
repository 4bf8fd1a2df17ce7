//! Structural pre-checks on a raw buffer.
//!
//! [`validate`] is cheap and fail-fast. It must pass before a buffer is handed
//! to the decoder, which relies on it for bounds.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::wire::{HEADER_SIZE, MAGIC, PACKET_LENGTH_OFFSET};

/// Outcome of [`validate`] in the `{valid, error}` shape collaborators report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// Whether the buffer passed every structural check.
    pub valid: bool,
    /// Machine-readable code of the first failed check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Human-readable description of the first failed check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<()>> for Validation {
    fn from(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                code: None,
                error: None,
            },
            Err(err) => Self {
                valid: false,
                code: Some(err.code()),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Check that `buffer` is structurally a packet of this protocol.
///
/// Checks run in order and stop at the first failure:
/// 1. the buffer holds at least the fixed header,
/// 2. it opens with the protocol magic,
/// 3. the declared `packet_length` equals the buffer length,
/// 4. the declared `packet_length` covers the fixed header.
///
/// # Errors
///
/// Returns [`Error::BufferTooSmall`], [`Error::InvalidMagic`],
/// [`Error::BufferSizeMismatch`] or [`Error::InvalidPacketLength`].
pub fn validate(buffer: &[u8]) -> Result<()> {
    if buffer.len() < HEADER_SIZE {
        return Err(Error::BufferTooSmall {
            actual: buffer.len(),
            minimum: HEADER_SIZE,
        });
    }

    let magic = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
    if magic != MAGIC {
        return Err(Error::InvalidMagic {
            actual: magic,
            expected: MAGIC,
        });
    }

    let declared =
        u16::from_le_bytes([buffer[PACKET_LENGTH_OFFSET], buffer[PACKET_LENGTH_OFFSET + 1]]);
    if usize::from(declared) != buffer.len() {
        return Err(Error::BufferSizeMismatch {
            actual: buffer.len(),
            declared,
        });
    }

    // Implied by the two checks above.
    if usize::from(declared) < HEADER_SIZE {
        return Err(Error::InvalidPacketLength {
            declared,
            minimum: HEADER_SIZE,
        });
    }

    Ok(())
}

/// Run [`validate`] and report in the `{valid, error}` shape.
#[must_use]
pub fn check(buffer: &[u8]) -> Validation {
    Validation::from(&validate(buffer))
}
