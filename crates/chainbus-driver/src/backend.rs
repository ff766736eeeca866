//! Serial back-end contract.
//!
//! The bus drives its physical medium through the [`Backend`] trait: raw
//! byte I/O with a per-operation timeout and an input-buffer discard.
//! Production code uses the tokio-serial implementation in
//! [`crate::serial`]; tests run on scripted in-memory fakes.
//!
//! A back-end is single-threaded by contract — serializing access is the
//! arbiter's job, and the bus holds its lock for the full duration of a
//! transaction.

/// Result of a read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    /// Bytes read. May be shorter than requested.
    pub data: Vec<u8>,
    /// Whether the full requested length arrived before the timeout.
    pub complete: bool,
}

impl Reception {
    /// A reception that produced no bytes at all.
    pub fn silence() -> Self {
        Reception {
            data: Vec::new(),
            complete: false,
        }
    }

    /// A complete reception of the given bytes.
    pub fn complete(data: Vec<u8>) -> Self {
        Reception {
            data,
            complete: true,
        }
    }

    /// A partial reception of the given bytes.
    pub fn partial(data: Vec<u8>) -> Self {
        Reception {
            data,
            complete: false,
        }
    }
}

/// Raw byte I/O on one physical bus.
///
/// Every primitive reports success through its return value instead of an
/// error type: the transport engine classifies failures itself.
#[allow(async_fn_in_trait)]
pub trait Backend: Send {
    /// Discard any buffered input bytes. Returns whether the discard
    /// succeeded.
    async fn clear_input(&mut self) -> bool;

    /// Write the bytes, blocking until written or timed out. Returns
    /// whether the write completed.
    async fn transmit(&mut self, bytes: &[u8]) -> bool;

    /// Read exactly `expected_len` bytes within the operation timeout.
    /// A short read returns the partial data with `complete == false`.
    async fn receive(&mut self, expected_len: usize) -> Reception;

    /// Write the bytes, then read exactly `expected_len` bytes. Returns
    /// `None` when the write itself failed.
    async fn transceive(&mut self, bytes: &[u8], expected_len: usize) -> Option<Reception> {
        if !self.transmit(bytes).await {
            return None;
        }
        Some(self.receive(expected_len).await)
    }
}
