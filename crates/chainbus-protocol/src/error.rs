//! Protocol error types.

use thiserror::Error;

/// Errors produced by the frame codec.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is too short to carry an address and a checksum.
    #[error("malformed frame: expected at least {expected} bytes, got {actual}")]
    Malformed {
        /// Minimum decodable length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// The trailing byte disagrees with the recomputed CRC.
    #[error("frame checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    Checksum {
        /// CRC recomputed over address + payload.
        computed: u8,
        /// CRC byte found on the wire.
        received: u8,
    },
}

/// Errors produced when parsing response payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Response payload is shorter than the fixed layout requires.
    #[error("response too short: expected at least {expected} bytes, got {actual}")]
    ShortResponse {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A declared inner length disagrees with the payload length.
    #[error("inconsistent length field: declared {declared}, available {available}")]
    LengthMismatch {
        /// Length declared inside the payload.
        declared: usize,
        /// Bytes actually available.
        available: usize,
    },
}
