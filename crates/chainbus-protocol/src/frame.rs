//! Frame encoding/decoding utilities.
//!
//! A chainbus frame is the payload wrapped in an address byte and a CRC:
//!
//! ```text
//! +---------+------------------+--------+
//! | address | payload[0..N]    | crc8   |
//! +---------+------------------+--------+
//! ```
//!
//! The CRC-8 covers the address byte and the payload, see [`crate::crc`].

use crate::constants::{FRAME_OVERHEAD, MIN_FRAME_LEN};
use crate::crc;
use crate::error::FrameError;

/// Encode a frame: prepend the address byte, append the CRC.
pub fn encode(address: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.push(address);
    buf.extend_from_slice(payload);
    buf.push(crc::crc(&buf));
    buf
}

/// Decode a frame, verifying length and checksum.
///
/// Returns the address byte and the payload slice. Fails with
/// [`FrameError::Malformed`] when the frame cannot hold an address and a
/// CRC, and with [`FrameError::Checksum`] when the trailing byte
/// disagrees with the recomputed CRC.
pub fn decode(frame: &[u8]) -> Result<(u8, &[u8]), FrameError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(FrameError::Malformed {
            expected: MIN_FRAME_LEN,
            actual: frame.len(),
        });
    }

    let (body, tail) = frame.split_at(frame.len() - 1);
    let received = tail[0];
    let computed = crc::crc(body);
    if computed != received {
        return Err(FrameError::Checksum { computed, received });
    }

    Ok((body[0], &body[1..]))
}
