//! Host-side transfer statistics.
//!
//! Each [`Device`](crate::Device) and [`Locator`](crate::Locator) owns one
//! counter block; the transport engine bumps it as attempts are
//! classified. Counters are monotonically non-decreasing. Reading them
//! produces a plain [`HostStatistics`] snapshot by value, so no reference
//! back to the owning endpoint is ever held.

use crate::error::BusError;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Internal atomic counter block owned by a bus endpoint.
#[derive(Debug, Default)]
pub struct HostCounters {
    checksum_errors: AtomicU32,
    no_answer: AtomicU32,
    missing_data: AtomicU32,
    transmit_errors: AtomicU32,
    successes: AtomicU32,
}

impl HostCounters {
    /// Create a zeroed counter block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful transaction.
    pub(crate) fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed attempt by its classification. Non-transport
    /// errors are not counted here; they never pass through the retry
    /// loop.
    pub(crate) fn record_failure(&self, class: &BusError) {
        let counter = match class {
            BusError::TransportChecksum => &self.checksum_errors,
            BusError::TransportReceptionNoAnswer => &self.no_answer,
            BusError::TransportReceptionMissingData => &self.missing_data,
            BusError::TransportTransmission => &self.transmit_errors,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of the counters.
    pub fn snapshot(&self) -> HostStatistics {
        HostStatistics {
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            no_answer: self.no_answer.load(Ordering::Relaxed),
            missing_data: self.missing_data.load(Ordering::Relaxed),
            transmit_errors: self.transmit_errors.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of an endpoint's transfer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostStatistics {
    /// Responses that failed the CRC check.
    pub checksum_errors: u32,
    /// Attempts that produced no response bytes at all.
    pub no_answer: u32,
    /// Attempts that produced a truncated response.
    pub missing_data: u32,
    /// Attempts whose request could not be written.
    pub transmit_errors: u32,
    /// Transactions that completed.
    pub successes: u32,
}

impl HostStatistics {
    /// Sum of all retryable failure counters.
    pub fn failed_attempts(&self) -> u32 {
        self.checksum_errors + self.no_answer + self.missing_data + self.transmit_errors
    }
}

/// Byte totals kept per bus instance.
#[derive(Debug, Default)]
pub struct ByteCounters {
    tx_bytes: AtomicU64,
    rx_bytes: AtomicU64,
}

impl ByteCounters {
    pub(crate) fn add_tx(&self, n: usize) {
        self.tx_bytes.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_rx(&self, n: usize) {
        self.rx_bytes.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Take a snapshot of the byte totals.
    pub fn snapshot(&self) -> BusByteTotals {
        BusByteTotals {
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of the bus byte totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusByteTotals {
    /// Bytes written to the line, including address and CRC bytes.
    pub tx_bytes: u64,
    /// Bytes read from the line (or charged in transmit-only mode).
    pub rx_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_mapping() {
        let counters = HostCounters::new();
        counters.record_failure(&BusError::TransportChecksum);
        counters.record_failure(&BusError::TransportChecksum);
        counters.record_failure(&BusError::TransportReceptionNoAnswer);
        counters.record_failure(&BusError::TransportReceptionMissingData);
        counters.record_failure(&BusError::TransportTransmission);
        counters.record_success();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.checksum_errors, 2);
        assert_eq!(snapshot.no_answer, 1);
        assert_eq!(snapshot.missing_data, 1);
        assert_eq!(snapshot.transmit_errors, 1);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failed_attempts(), 5);
    }

    #[test]
    fn test_non_transport_errors_not_counted() {
        let counters = HostCounters::new();
        counters.record_failure(&BusError::DeviceNotInitialized);
        counters.record_failure(&BusError::NoAssertionDetected);
        assert_eq!(counters.snapshot().failed_attempts(), 0);
    }
}
