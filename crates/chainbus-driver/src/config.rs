//! Bus and discovery configuration.

use crate::error::BusError;
use chainbus_protocol::{MAX_UNICAST_ADDRESS, MIN_UNICAST_ADDRESS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one bus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Serial port identifier (e.g. `/dev/ttyUSB0`).
    pub port: String,

    /// Baud rate. Must be positive.
    pub baud: u32,

    /// Per-operation timeout in milliseconds.
    pub timeout_ms: u64,

    /// Time a slave needs between receiving the last byte of a request
    /// and being ready for the next transaction. Added to the quiet time
    /// after broadcasts.
    pub device_processing_time: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            port: String::new(),
            baud: 115_200,
            timeout_ms: 500,
            device_processing_time: Duration::from_millis(1),
        }
    }
}

impl BusConfig {
    /// Create a config for the given port at the given baud rate.
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        BusConfig {
            port: port.into(),
            baud,
            ..Default::default()
        }
    }

    /// Set the per-operation timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the device processing time.
    pub fn with_device_processing_time(mut self, processing: Duration) -> Self {
        self.device_processing_time = processing;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.baud == 0 {
            return Err(BusError::InvalidArgument("baud rate must be positive".into()));
        }
        Ok(())
    }

    /// The per-operation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for one binary UUID search instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum delay between two assertion broadcasts, protecting slow
    /// devices.
    pub delay_time: Duration,

    /// Restrict matching to devices without a bus address (the 0x05
    /// selector instead of 0x04).
    pub only_unaddressed: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            delay_time: Duration::from_millis(5),
            only_unaddressed: false,
        }
    }
}

impl SearchConfig {
    /// Restrict the search to unaddressed devices.
    pub fn only_unaddressed(mut self) -> Self {
        self.only_unaddressed = true;
        self
    }

    /// Set the inter-assertion delay.
    pub fn with_delay_time(mut self, delay: Duration) -> Self {
        self.delay_time = delay;
        self
    }
}

/// An inclusive unicast address range for bus scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    /// First address to probe.
    pub first: u8,
    /// Last address to probe, inclusive.
    pub last: u8,
}

impl ScanRange {
    /// Create a validated scan range within `[1, 127]`.
    pub fn new(first: u8, last: u8) -> Result<Self, BusError> {
        if first < MIN_UNICAST_ADDRESS || last > MAX_UNICAST_ADDRESS || first > last {
            return Err(BusError::InvalidArgument(format!(
                "scan range {}..={} outside [{}..={}]",
                first, last, MIN_UNICAST_ADDRESS, MAX_UNICAST_ADDRESS
            )));
        }
        Ok(ScanRange { first, last })
    }

    /// The full unicast range.
    pub fn full() -> Self {
        ScanRange {
            first: MIN_UNICAST_ADDRESS,
            last: MAX_UNICAST_ADDRESS,
        }
    }

    /// Iterate over the addresses in this range.
    pub fn addresses(&self) -> impl Iterator<Item = u8> {
        self.first..=self.last
    }
}
