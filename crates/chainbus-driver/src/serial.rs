//! Serial port back-end on tokio-serial.

use crate::backend::{Backend, Reception};
use crate::config::BusConfig;
use crate::error::BusError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::warn;

/// A [`Backend`] over a physical serial port.
pub struct SerialBackend {
    stream: SerialStream,
    timeout: Duration,
}

impl SerialBackend {
    /// Open the serial port described by the bus configuration.
    pub fn open(config: &BusConfig) -> Result<Self, BusError> {
        config.validate()?;
        let stream = tokio_serial::new(&config.port, config.baud)
            .open_native_async()
            .map_err(|err| {
                warn!("failed to open serial port {}: {}", config.port, err);
                BusError::TransportTransmission
            })?;
        Ok(SerialBackend {
            stream,
            timeout: config.timeout(),
        })
    }
}

impl Backend for SerialBackend {
    async fn clear_input(&mut self) -> bool {
        self.stream.clear(ClearBuffer::Input).is_ok()
    }

    async fn transmit(&mut self, bytes: &[u8]) -> bool {
        let deadline = Instant::now() + self.timeout;
        let wrote = matches!(
            timeout_at(deadline, self.stream.write_all(bytes)).await,
            Ok(Ok(()))
        );
        if !wrote {
            return false;
        }
        matches!(timeout_at(deadline, self.stream.flush()).await, Ok(Ok(())))
    }

    async fn receive(&mut self, expected_len: usize) -> Reception {
        let mut data = vec![0u8; expected_len];
        let mut filled = 0;
        let deadline = Instant::now() + self.timeout;

        while filled < expected_len {
            match timeout_at(deadline, self.stream.read(&mut data[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                // Read error or deadline reached: return what arrived.
                Ok(Err(_)) | Err(_) => break,
            }
        }

        data.truncate(filled);
        Reception {
            complete: filled == expected_len,
            data,
        }
    }
}
