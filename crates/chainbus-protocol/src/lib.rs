//! Chainbus Wire Protocol
//!
//! This crate provides the wire-level types for the chainbus half-duplex
//! fieldbus: framing, checksums, request encoding, and response parsing.
//! It contains no I/O — the host driver lives in `chainbus-driver`, and
//! slave firmware can reuse the same types on the device side.
//!
//! # Protocol Overview
//!
//! Any number of slave devices share one physical segment (typically
//! RS-485); the host originates every exchange. A frame on the wire is:
//!
//! ```text
//! +---------+------------------+--------+
//! | address | payload[0..N]    | crc8   |
//! +---------+------------------+--------+
//! ```
//!
//! Address `0x00` is reserved for broadcasts; unicast addresses lie in
//! `[1, 127]`. The CRC-8 covers the address byte and the payload.
//!
//! Requests are either:
//!
//! - **Device requests** (unicast): start with the `0x00` device-info
//!   family byte, see [`DeviceRequest`]
//! - **Broadcast requests** (address `0x00`): start with `0x00` followed
//!   by a sub-operation byte, see [`BroadcastRequest`]
//!
//! # Example
//!
//! ```rust,ignore
//! use chainbus_protocol::{frame, DeviceRequest};
//!
//! // Build a basic-info request for the slave at address 5
//! let wire = frame::encode(5, &DeviceRequest::BasicInfo.encode());
//!
//! // Parse the reply
//! let (addr, payload) = frame::decode(&received)?;
//! let info = chainbus_protocol::DeviceInfo::decode(payload)?;
//! ```

mod commands;
mod constants;
mod error;
mod info;
mod search;

pub mod crc;
pub mod frame;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use info::*;
pub use search::*;
