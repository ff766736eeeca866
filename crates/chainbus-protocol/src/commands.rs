//! Requests the host can place on the bus.
//!
//! [`DeviceRequest`] covers the generic device-info protocol every slave
//! speaks (unicast). [`BroadcastRequest`] covers the address-assignment
//! and discovery operations, always sent to address `0x00`.

use crate::constants::*;
use crate::search::SearchAddress;
use bytes::BufMut;

/// Requests of the generic device protocol, sent to one slave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Liveness check: the shortest valid frame, an empty payload.
    Ping,

    /// Fetch the 11-byte basic DeviceInfo packet.
    BasicInfo,

    /// Read the uptime tick counter.
    Uptime,

    /// Read the device name string (legacy layout).
    Name,

    /// Read the version string (legacy layout).
    Version,

    /// Read the slave-side packet statistics.
    Statistics,

    /// Read the UUID (legacy devices; extended packets carry it inline).
    Uuid,

    /// Read the extended info block (extended layout).
    ExtendedInfo,

    /// Read static-storage capacity and page size.
    StorageGeometry,

    /// Read from static storage.
    StorageRead {
        /// Byte offset into storage.
        offset: u32,
        /// Number of bytes to read.
        len: u16,
    },

    /// Write to static storage. Writes must start at a page boundary;
    /// a write shorter than a page erases the remainder of that page.
    StorageWrite {
        /// Byte offset into storage, a multiple of the page size.
        offset: u32,
        /// Data to write.
        data: Vec<u8>,
    },
}

impl DeviceRequest {
    /// Encode the request payload (the frame codec adds address + CRC).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            DeviceRequest::Ping => Vec::new(),

            DeviceRequest::BasicInfo => vec![CMD_FAMILY_INFO],

            DeviceRequest::Name => vec![CMD_FAMILY_INFO, INFO_OP_NAME],
            DeviceRequest::Uptime => vec![CMD_FAMILY_INFO, INFO_OP_UPTIME],
            DeviceRequest::Version => vec![CMD_FAMILY_INFO, INFO_OP_VERSION],
            DeviceRequest::Statistics => vec![CMD_FAMILY_INFO, INFO_OP_STATISTICS],
            DeviceRequest::Uuid => vec![CMD_FAMILY_INFO, INFO_OP_UUID],
            DeviceRequest::ExtendedInfo => vec![CMD_FAMILY_INFO, INFO_OP_EXTENDED_INFO],
            DeviceRequest::StorageGeometry => vec![CMD_FAMILY_INFO, INFO_OP_STORAGE_GEOMETRY],

            DeviceRequest::StorageRead { offset, len } => {
                let mut buf = Vec::with_capacity(8);
                buf.push(CMD_FAMILY_INFO);
                buf.push(INFO_OP_STORAGE_READ);
                buf.put_u32_le(*offset);
                buf.put_u16_le(*len);
                buf
            }

            DeviceRequest::StorageWrite { offset, data } => {
                let mut buf = Vec::with_capacity(6 + data.len());
                buf.push(CMD_FAMILY_INFO);
                buf.push(INFO_OP_STORAGE_WRITE);
                buf.put_u32_le(*offset);
                buf.extend_from_slice(data);
                buf
            }
        }
    }
}

/// Requests sent to the broadcast address `0x00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastRequest {
    /// "Who-is-there": the unique unaddressed device replies with its UUID.
    WhoIsThere,

    /// Ping one device by UUID; no response.
    PingUuid {
        /// Target UUID.
        uuid: u32,
    },

    /// Read the bus address currently assigned to a UUID.
    ReadBusAddress {
        /// Target UUID.
        uuid: u32,
    },

    /// Assign a bus address to a UUID; the device acks with 1 or rejects
    /// with 0.
    SetBusAddress {
        /// Target UUID.
        uuid: u32,
        /// Address to assign, in `[1, 127]`.
        address: u8,
    },

    /// Reset one device's address to none.
    ResetBusAddress {
        /// Target UUID.
        uuid: u32,
    },

    /// Enable bus-neighbor links.
    EnableNeighbours,

    /// Disable bus-neighbor links.
    DisableNeighbours,

    /// Reset all bus addresses.
    ResetAllAddresses,

    /// Request a bus assertion from every device matching the prefix.
    RequestAssertion {
        /// Prefix-tree node to match against.
        target: SearchAddress,
        /// Restrict matching to devices without a bus address.
        only_unaddressed: bool,
    },

    /// Put all devices to sleep.
    Sleep,
}

impl BroadcastRequest {
    /// Encode the request payload (the frame codec adds address + CRC).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.push(CMD_FAMILY_INFO);

        match self {
            BroadcastRequest::WhoIsThere => {
                buf.push(BCAST_OP_ADDRESS);
            }
            BroadcastRequest::PingUuid { uuid } => {
                buf.push(BCAST_OP_ADDRESS);
                buf.put_u32_le(*uuid);
            }
            BroadcastRequest::ReadBusAddress { uuid } => {
                buf.push(BCAST_OP_ADDRESS);
                buf.put_u32_le(*uuid);
                buf.push(ADDRESS_TAIL_ASSIGN);
            }
            BroadcastRequest::SetBusAddress { uuid, address } => {
                buf.push(BCAST_OP_ADDRESS);
                buf.put_u32_le(*uuid);
                buf.push(ADDRESS_TAIL_ASSIGN);
                buf.push(*address);
            }
            BroadcastRequest::ResetBusAddress { uuid } => {
                buf.push(BCAST_OP_ADDRESS);
                buf.put_u32_le(*uuid);
                buf.push(ADDRESS_TAIL_RESET);
            }
            BroadcastRequest::EnableNeighbours => {
                buf.push(BCAST_OP_ENABLE_NEIGHBOURS);
            }
            BroadcastRequest::DisableNeighbours => {
                buf.push(BCAST_OP_DISABLE_NEIGHBOURS);
            }
            BroadcastRequest::ResetAllAddresses => {
                buf.push(BCAST_OP_RESET_ALL);
            }
            BroadcastRequest::RequestAssertion {
                target,
                only_unaddressed,
            } => {
                buf.push(if *only_unaddressed {
                    BCAST_OP_ASSERT_UNADDRESSED
                } else {
                    BCAST_OP_ASSERT
                });
                target.encode_into(&mut buf);
            }
            BroadcastRequest::Sleep => {
                buf.push(BCAST_OP_SLEEP);
            }
        }
        buf
    }
}
