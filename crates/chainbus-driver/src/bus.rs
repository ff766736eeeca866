//! Bus arbiter and transport engine.
//!
//! All transactions on one physical bus funnel through a single fair
//! mutex ([`tokio::sync::Mutex`] queues waiters FIFO). The lock is held
//! for the full duration of an attempt triplet, so retries and the
//! inter-packet quiet time are atomic with respect to other callers.
//!
//! The transport engine wraps each request in the frame codec, drives the
//! back-end, classifies raw outcomes into the statistics counters, and
//! retries transient failures up to a fixed budget. Broadcast receives
//! (used only during address assignment and the assertion search) run a
//! single attempt and map "no answer" to
//! [`BusError::NoAssertionDetected`] — a positive signal that zero slaves
//! matched.

use crate::backend::Backend;
use crate::config::BusConfig;
use crate::error::BusError;
use crate::serial::SerialBackend;
use crate::stats::{BusByteTotals, ByteCounters, HostCounters};
use crate::timing::Timing;
use chainbus_protocol::{frame, BROADCAST_ADDRESS, FRAME_OVERHEAD, MAX_UNICAST_ADDRESS};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Number of attempts the transport engine makes per logical call.
pub const RETRY_ATTEMPTS: u32 = 3;

/// How the engine drives the back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransmissionMode {
    /// Write the request and read the response.
    #[default]
    Normal,
    /// Write only; pretend the response arrived and charge the expected
    /// byte count against the receive totals. Used for one-way telemetry
    /// paths.
    TransmitOnly,
    /// Skip the write; read as usual. Used for offline capture replay.
    ReceiveOnly,
}

/// A handle to one physical bus. Cheap to clone; all clones share the
/// same line and timing state.
pub struct Bus<B: Backend> {
    shared: Arc<Shared<B>>,
}

impl<B: Backend> Clone for Bus<B> {
    fn clone(&self) -> Self {
        Bus {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<B> {
    line: Mutex<Line<B>>,
    timing: Timing,
    bytes: ByteCounters,
}

/// State protected by the bus lock.
struct Line<B> {
    backend: B,
    mode: TransmissionMode,
    /// Target of the previous transaction. Gaps apply only when the
    /// target changes — the same device has been busy with our request,
    /// not another slave's.
    last_target: Option<u8>,
    /// Earliest instant the next transaction to a different target may
    /// start.
    not_before: Instant,
}

impl Bus<SerialBackend> {
    /// Open a bus on the serial port described by the configuration.
    pub fn open(config: &BusConfig) -> Result<Self, BusError> {
        let backend = SerialBackend::open(config)?;
        Bus::new(backend, config)
    }
}

impl<B: Backend> Bus<B> {
    /// Create a bus over an arbitrary back-end.
    pub fn new(backend: B, config: &BusConfig) -> Result<Self, BusError> {
        config.validate()?;
        let timing = Timing::from_baud(config.baud, config.device_processing_time);
        Ok(Bus {
            shared: Arc::new(Shared {
                line: Mutex::new(Line {
                    backend,
                    mode: TransmissionMode::default(),
                    last_target: None,
                    not_before: Instant::now(),
                }),
                timing,
                bytes: ByteCounters::default(),
            }),
        })
    }

    /// The timing constants derived from the configuration.
    pub fn timing(&self) -> Timing {
        self.shared.timing
    }

    /// Byte totals written to and read from the line.
    pub fn byte_totals(&self) -> BusByteTotals {
        self.shared.bytes.snapshot()
    }

    /// Switch the transmission mode. Waits for any in-flight transaction.
    pub async fn set_transmission_mode(&self, mode: TransmissionMode) {
        self.shared.line.lock().await.mode = mode;
    }

    /// The current transmission mode.
    pub async fn transmission_mode(&self) -> TransmissionMode {
        self.shared.line.lock().await.mode
    }

    /// Exchange a request for a response with a slave. Retries transient
    /// failures up to [`RETRY_ATTEMPTS`] times; only the final
    /// classification escapes.
    pub(crate) async fn transceive(
        &self,
        address: u8,
        payload: &[u8],
        expected_len: usize,
        counters: &HostCounters,
    ) -> Result<Vec<u8>, BusError> {
        self.transact(address, payload, Some(expected_len), RETRY_ATTEMPTS, counters)
            .await
    }

    /// Send a request that expects no response.
    pub(crate) async fn transmit(
        &self,
        address: u8,
        payload: &[u8],
        counters: &HostCounters,
    ) -> Result<(), BusError> {
        self.transact(address, payload, None, RETRY_ATTEMPTS, counters)
            .await
            .map(|_| ())
    }

    /// Broadcast a request and listen for a reply. Single attempt, no
    /// retries: silence is the information, not a fault to paper over.
    pub(crate) async fn broadcast_transceive(
        &self,
        payload: &[u8],
        expected_len: usize,
        counters: &HostCounters,
    ) -> Result<Vec<u8>, BusError> {
        match self
            .transact(BROADCAST_ADDRESS, payload, Some(expected_len), 1, counters)
            .await
        {
            Err(BusError::TransportReceptionNoAnswer) => Err(BusError::NoAssertionDetected),
            other => other,
        }
    }

    async fn transact(
        &self,
        address: u8,
        payload: &[u8],
        expected_len: Option<usize>,
        attempts: u32,
        counters: &HostCounters,
    ) -> Result<Vec<u8>, BusError> {
        if address > MAX_UNICAST_ADDRESS {
            return Err(BusError::InvalidArgument(format!(
                "address {} outside [0, {}]",
                address, MAX_UNICAST_ADDRESS
            )));
        }

        let request = frame::encode(address, payload);
        let raw_expected = expected_len.map(|len| len + FRAME_OVERHEAD);

        // The lock spans the whole attempt triplet, so interleaved
        // callers never split a retry cycle.
        let mut line = self.shared.line.lock().await;

        let mut last_error = BusError::Unspecified;
        for attempt in 1..=attempts {
            match self.attempt(&mut line, address, &request, raw_expected).await {
                Ok(response) => {
                    counters.record_success();
                    trace!(address, attempt, len = response.len(), "transaction ok");
                    return Ok(response);
                }
                Err(class) => {
                    counters.record_failure(&class);
                    debug!(address, attempt, error = %class, "transaction attempt failed");
                    last_error = class;
                }
            }
        }
        Err(last_error)
    }

    /// One attempt: clear, pace, write, read, validate.
    async fn attempt(
        &self,
        line: &mut Line<B>,
        address: u8,
        request: &[u8],
        raw_expected: Option<usize>,
    ) -> Result<Vec<u8>, BusError> {
        let mode = line.mode;

        // First act of every attempt: resynchronize the input stream.
        if !line.backend.clear_input().await {
            return Err(BusError::TransportTransmission);
        }

        // Honor the remaining inter-packet gap when the target changes.
        if line.last_target != Some(address) {
            sleep_until(line.not_before).await;
        }

        let reception = match (raw_expected, mode) {
            (raw, TransmissionMode::ReceiveOnly) => {
                let Some(raw) = raw else {
                    return Ok(Vec::new());
                };
                line.backend.receive(raw).await
            }
            (None, _) => {
                if !line.backend.transmit(request).await {
                    return Err(BusError::TransportTransmission);
                }
                self.note_write(line, address, request.len());
                return Ok(Vec::new());
            }
            (Some(raw), TransmissionMode::TransmitOnly) => {
                if !line.backend.transmit(request).await {
                    return Err(BusError::TransportTransmission);
                }
                self.note_write(line, address, request.len());
                // Pretend the response arrived; charge it to the receive
                // totals so replay captures stay byte-accurate.
                self.shared.bytes.add_rx(raw);
                return Ok(vec![0; raw - FRAME_OVERHEAD]);
            }
            (Some(raw), TransmissionMode::Normal) => {
                let Some(reception) = line.backend.transceive(request, raw).await else {
                    return Err(BusError::TransportTransmission);
                };
                self.note_write(line, address, request.len());
                reception
            }
        };

        self.shared.bytes.add_rx(reception.data.len());

        if reception.data.is_empty() {
            return Err(BusError::TransportReceptionNoAnswer);
        }
        if !reception.complete {
            return Err(BusError::TransportReceptionMissingData);
        }

        match frame::decode(&reception.data) {
            Ok((echo, payload)) if echo == address => Ok(payload.to_vec()),
            // A valid frame from the wrong address is line corruption as
            // far as this transaction is concerned.
            Ok(_) | Err(_) => Err(BusError::TransportChecksum),
        }
    }

    /// Bookkeeping after bytes went out: totals, pacing deadline, target.
    fn note_write(&self, line: &mut Line<B>, address: u8, len: usize) {
        self.shared.bytes.add_tx(len);
        let gap = if address == BROADCAST_ADDRESS {
            self.shared.timing.post_broadcast_gap(len)
        } else {
            self.shared.timing.post_transceive_gap(len)
        };
        line.not_before = Instant::now() + gap;
        line.last_target = Some(address);
    }
}
