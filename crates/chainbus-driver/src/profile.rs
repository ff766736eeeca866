//! Extension surface for device profiles.
//!
//! Leaf profiles (motor controllers, IO expanders, ...) layer their own
//! opcode maps on top of the generic device protocol. A profile owns a
//! [`Device`] handle and drives it through
//! [`Device::transceive`](crate::Device::transceive) — composition, no
//! inheritance chain. Profile-specific failures travel through
//! [`BusError::Profile`](crate::BusError::Profile), so new profiles add
//! codes without touching the core taxonomy.
//!
//! ```rust,ignore
//! struct RelayBank<B: Backend> {
//!     core: Device<B>,
//! }
//!
//! impl<B: Backend> RelayBank<B> {
//!     async fn switch(&self, channel: u8, on: bool) -> Result<(), BusError> {
//!         let reply = self.core.transceive(&[0x10, channel, on as u8], 1).await?;
//!         match reply[0] {
//!             0 => Ok(()),
//!             code => Err(ProfileError::new(code as u32, "relay refused switch").into()),
//!         }
//!     }
//! }
//!
//! impl<B: Backend> DeviceProfile<B> for RelayBank<B> {
//!     fn core(&self) -> &Device<B> {
//!         &self.core
//!     }
//! }
//! ```

use crate::backend::Backend;
use crate::device::Device;
use thiserror::Error;

/// An error raised by a device-profile extension.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("profile error {code}: {message}")]
pub struct ProfileError {
    /// Profile-defined error code.
    pub code: u32,
    /// Human-readable description.
    pub message: String,
}

impl ProfileError {
    /// Create a profile error.
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        ProfileError {
            code,
            message: message.into(),
        }
    }
}

/// A profile layered over the generic device protocol.
pub trait DeviceProfile<B: Backend> {
    /// The device handle this profile's opcodes travel through.
    fn core(&self) -> &Device<B>;

    /// The bus address of the underlying device.
    fn address(&self) -> u8 {
        self.core().address()
    }
}
