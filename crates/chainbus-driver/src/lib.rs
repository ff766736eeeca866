//! Chainbus Host Driver
//!
//! Host-side driver for the chainbus half-duplex fieldbus: any number of
//! slave devices share one serial segment (typically RS-485) and the
//! host originates every exchange.
//!
//! # Architecture
//!
//! - [`Backend`] is the raw byte I/O contract; [`serial::SerialBackend`]
//!   implements it over tokio-serial, tests run on in-memory fakes.
//! - [`Bus`] is the arbiter and transport engine: one fair lock per
//!   physical bus, baud-derived inter-packet pacing, a three-attempt
//!   retry loop with outcome classification, and the transmission-mode
//!   knob for capture replay and one-way telemetry.
//! - [`Device`] speaks the generic per-slave protocol: info, uptime,
//!   statistics, and paged static storage. Profiles layer their own
//!   opcodes through [`Device::transceive`], see [`profile`].
//! - [`Locator`] issues the broadcast-only operations: address
//!   assignment, neighbor control, assertion selectors, and bus scans.
//! - [`UuidSearch`] walks the UUID prefix tree over the assertion
//!   broadcast; [`assign_addresses`] combines it with the sequential
//!   neighbor-chaining walk into the end-to-end enumeration workflow.
//!
//! Every operation is a suspendable action; the [`blocking`] module
//! drives the same implementations on a current-thread runtime for
//! synchronous callers.
//!
//! # Example
//!
//! ```rust,ignore
//! use chainbus_driver::{Bus, BusConfig};
//!
//! let bus = Bus::open(&BusConfig::new("/dev/ttyUSB0", 115_200))?;
//! let locator = bus.locator();
//! let found = chainbus_driver::assign_addresses(&locator, true, true).await?;
//!
//! for (i, uuid) in found.devices.iter().enumerate() {
//!     let device = bus.device((i + 1) as u8)?;
//!     device.initialize().await?;
//!     println!("{:08X}: {}", uuid, device.name().await?);
//! }
//! ```

pub mod backend;
pub mod blocking;
pub mod profile;
pub mod serial;

mod bus;
mod config;
mod device;
mod enumerate;
mod error;
mod locator;
mod search;
mod stats;
mod storage;
mod timing;

pub use backend::{Backend, Reception};
pub use bus::{Bus, TransmissionMode, RETRY_ATTEMPTS};
pub use config::{BusConfig, ScanRange, SearchConfig};
pub use device::{Device, DeviceState};
pub use enumerate::{assign_addresses, Enumeration};
pub use error::BusError;
pub use locator::Locator;
pub use profile::{DeviceProfile, ProfileError};
pub use search::UuidSearch;
pub use stats::{BusByteTotals, HostStatistics};
pub use timing::Timing;
