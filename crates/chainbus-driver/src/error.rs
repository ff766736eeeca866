//! Driver error types.

use crate::profile::ProfileError;
use chainbus_protocol::WireError;
use thiserror::Error;

/// Errors surfaced at the public boundary of the driver.
///
/// Success is expressed as `Ok(_)`; every non-success outcome of the wire
/// protocol maps to exactly one variant here. Transport-level errors are
/// absorbed by the retry loop — only the final classification escapes.
/// Device-level errors short-circuit immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Unknown failure; should not occur in steady state.
    #[error("unspecified failure")]
    Unspecified,

    /// Caller-side misuse (address out of range, bad flag combination).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The device answered an opcode with a "not implemented" status.
    #[error("operation not supported by the device")]
    NotSupported,

    /// The response arrived but its checksum was wrong.
    #[error("transport checksum error")]
    TransportChecksum,

    /// No response bytes arrived within the timeout.
    ///
    /// Historically also known as `TransportReceptionError`.
    #[error("transport reception error: no answer")]
    TransportReceptionNoAnswer,

    /// The response arrived truncated.
    #[error("transport reception error: missing data")]
    TransportReceptionMissingData,

    /// The request could not be written to the bus.
    #[error("transport transmission error")]
    TransportTransmission,

    /// An operation needs DeviceInfo but the device was never initialized.
    #[error("device not initialized")]
    DeviceNotInitialized,

    /// The device does not keep packet statistics.
    #[error("device does not keep packet statistics")]
    DeviceStatisticsNotSupported,

    /// The device reports no uptime counter (`uptime_frequency == 0`).
    #[error("device does not report uptime")]
    DeviceUptimeNotSupported,

    /// The device refused the bus address it was offered.
    #[error("device rejected the bus address")]
    DeviceRejectedBusAddress,

    /// A static-storage offset or size was rejected.
    #[error("static storage address or size error")]
    DeviceStaticStorageAddressSize,

    /// A static-storage write failed on the device.
    #[error("static storage write error")]
    DeviceStaticStorageWrite,

    /// No device asserted the bus in response to a selector broadcast.
    ///
    /// This is a search signal, not a failure: it positively states that
    /// zero slaves matched.
    #[error("no bus assertion detected")]
    NoAssertionDetected,

    /// Error raised by a device-profile extension.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl BusError {
    /// Whether this error came from the transport layer (and was therefore
    /// subject to the retry budget).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BusError::TransportChecksum
                | BusError::TransportReceptionNoAnswer
                | BusError::TransportReceptionMissingData
                | BusError::TransportTransmission
        )
    }
}

impl From<WireError> for BusError {
    fn from(err: WireError) -> Self {
        match err {
            // A payload shorter than its fixed layout means the device sent
            // fewer bytes than the operation requires.
            WireError::ShortResponse { .. } => BusError::TransportReceptionMissingData,
            WireError::InvalidUtf8 | WireError::LengthMismatch { .. } => BusError::Unspecified,
        }
    }
}
