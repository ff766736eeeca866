//! Baud-derived inter-packet timing.
//!
//! On a physical UART the arbiter must keep a minimum gap between two
//! transactions aimed at different slaves. The gap is derived from the
//! baud rate assuming 8N1 framing:
//!
//! - byte duration: `10 / baud` seconds (8 data bits + start + stop)
//! - end-of-packet quiet time: `15 / baud` seconds (>= 1.5 idle byte times)
//! - gap after a transceive: `byte_duration * tx_len + quiet_time`
//! - gap after a broadcast: the above plus the device processing time
//!
//! These are protocol constants, not tuning knobs.

use std::time::Duration;

/// Precomputed timing for one bus instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    byte_duration: Duration,
    quiet_time: Duration,
    processing_time: Duration,
}

impl Timing {
    /// Derive the timing from a baud rate and the device processing time.
    /// The baud rate must be positive (validated by the bus config).
    pub fn from_baud(baud: u32, processing_time: Duration) -> Self {
        let baud = f64::from(baud.max(1));
        Timing {
            byte_duration: Duration::from_secs_f64(10.0 / baud),
            quiet_time: Duration::from_secs_f64(15.0 / baud),
            processing_time,
        }
    }

    /// Duration of one byte on the wire.
    pub fn byte_duration(&self) -> Duration {
        self.byte_duration
    }

    /// Idle time required after the last byte of a packet.
    pub fn quiet_time(&self) -> Duration {
        self.quiet_time
    }

    /// Required gap after writing `tx_len` bytes of a unicast transceive.
    pub fn post_transceive_gap(&self, tx_len: usize) -> Duration {
        self.byte_duration * tx_len as u32 + self.quiet_time
    }

    /// Required gap after writing `tx_len` bytes of a broadcast.
    pub fn post_broadcast_gap(&self, tx_len: usize) -> Duration {
        self.post_transceive_gap(tx_len) + self.processing_time
    }
}
