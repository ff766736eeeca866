//! Device information payloads.
//!
//! Every slave answers the basic-info request with an 11-byte packet.
//! Two layouts exist: the legacy layout carries the string lengths and
//! buffer size inline, the extended layout instead carries the length of
//! a separate extended-info block and the device UUID.
//!
//! ## Basic packet layout
//!
//! | Offset | Field                                                    |
//! |--------|----------------------------------------------------------|
//! | 0      | protocol_id                                              |
//! | 1      | type_id                                                  |
//! | 2      | flags: bits 0..2 crc_kind, bit 3 format, bit 7 stats     |
//! | 3..5   | uptime_frequency (u16 LE, 0 = uptime unsupported)        |
//! | 5..11  | layout-specific, see [`InfoLayout`]                      |

use crate::constants::{BASIC_INFO_LEN, PACKET_STATISTICS_LEN, STORAGE_GEOMETRY_LEN};
use crate::error::WireError;
use bytes::BufMut;

/// Bit 3 of the flags byte: set for the extended packet layout.
const FLAG_EXTENDED_FORMAT: u8 = 1 << 3;
/// Bit 7 of the flags byte: set when the slave keeps packet statistics.
const FLAG_STATISTICS: u8 = 1 << 7;
/// Bits 0..2 of the flags byte: checksum variant identifier.
const CRC_KIND_MASK: u8 = 0b0000_0111;

/// Layout-specific tail of the basic info packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoLayout {
    /// Legacy layout: strings are fetched with dedicated requests.
    Legacy {
        /// Largest frame the slave accepts, including address + CRC.
        buffer_size: u16,
        /// Length of the device-name string.
        name_length: u8,
        /// Length of the version string.
        version_length: u8,
    },
    /// Extended layout: strings live in one extended-info block.
    Extended {
        /// Length of the extended-info block in bytes.
        extended_info_length: u16,
        /// Device UUID.
        uuid: u32,
    },
}

/// Basic device information, populated once per device and then read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Protocol revision the slave speaks.
    pub protocol_id: u8,
    /// Device type identifier.
    pub type_id: u8,
    /// Checksum variant identifier (3 bits).
    pub crc_kind: u8,
    /// Whether the slave keeps packet statistics.
    pub statistics_available: bool,
    /// Uptime tick frequency in Hz; 0 means uptime is unsupported.
    pub uptime_frequency: u16,
    /// Layout-specific fields.
    pub layout: InfoLayout,
}

impl DeviceInfo {
    /// Whether this device uses the extended packet layout.
    pub fn is_extended(&self) -> bool {
        matches!(self.layout, InfoLayout::Extended { .. })
    }

    /// Decode the 11-byte basic info payload.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < BASIC_INFO_LEN {
            return Err(WireError::ShortResponse {
                expected: BASIC_INFO_LEN,
                actual: payload.len(),
            });
        }

        let flags = payload[2];
        let uptime_frequency = u16::from_le_bytes([payload[3], payload[4]]);

        let layout = if flags & FLAG_EXTENDED_FORMAT != 0 {
            InfoLayout::Extended {
                extended_info_length: u16::from_le_bytes([payload[5], payload[6]]),
                uuid: u32::from_le_bytes([payload[7], payload[8], payload[9], payload[10]]),
            }
        } else {
            InfoLayout::Legacy {
                buffer_size: u16::from_le_bytes([payload[5], payload[6]]),
                name_length: payload[9],
                version_length: payload[10],
            }
        };

        Ok(DeviceInfo {
            protocol_id: payload[0],
            type_id: payload[1],
            crc_kind: flags & CRC_KIND_MASK,
            statistics_available: flags & FLAG_STATISTICS != 0,
            uptime_frequency,
            layout,
        })
    }

    /// Encode the 11-byte basic info payload (slave side).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BASIC_INFO_LEN);
        buf.push(self.protocol_id);
        buf.push(self.type_id);

        let mut flags = self.crc_kind & CRC_KIND_MASK;
        if self.is_extended() {
            flags |= FLAG_EXTENDED_FORMAT;
        }
        if self.statistics_available {
            flags |= FLAG_STATISTICS;
        }
        buf.push(flags);
        buf.put_u16_le(self.uptime_frequency);

        match self.layout {
            InfoLayout::Legacy {
                buffer_size,
                name_length,
                version_length,
            } => {
                buf.put_u16_le(buffer_size);
                buf.put_u16_le(0); // reserved
                buf.push(name_length);
                buf.push(version_length);
            }
            InfoLayout::Extended {
                extended_info_length,
                uuid,
            } => {
                buf.put_u16_le(extended_info_length);
                buf.put_u32_le(uuid);
            }
        }
        buf
    }
}

/// Extended device information, fetched at most once on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedInfo {
    /// Human-readable device name.
    pub device_name: String,
    /// Firmware version string.
    pub version: String,
    /// Largest frame the slave accepts, including address + CRC.
    pub buffer_size: u16,
}

impl ExtendedInfo {
    /// Decode an extended-info block:
    /// `reserved:u8, name_len:u8, version_len:u8, buffer_size:u16, name[], version[]`.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < 5 {
            return Err(WireError::ShortResponse {
                expected: 5,
                actual: payload.len(),
            });
        }

        let name_len = payload[1] as usize;
        let version_len = payload[2] as usize;
        let buffer_size = u16::from_le_bytes([payload[3], payload[4]]);

        let declared = 5 + name_len + version_len;
        if payload.len() < declared {
            return Err(WireError::LengthMismatch {
                declared,
                available: payload.len(),
            });
        }

        let device_name = std::str::from_utf8(&payload[5..5 + name_len])
            .map_err(|_| WireError::InvalidUtf8)?
            .to_string();
        let version = std::str::from_utf8(&payload[5 + name_len..declared])
            .map_err(|_| WireError::InvalidUtf8)?
            .to_string();

        Ok(ExtendedInfo {
            device_name,
            version,
            buffer_size,
        })
    }

    /// Encode an extended-info block (slave side).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5 + self.device_name.len() + self.version.len());
        buf.push(0); // reserved
        buf.push(self.device_name.len() as u8);
        buf.push(self.version.len() as u8);
        buf.put_u16_le(self.buffer_size);
        buf.extend_from_slice(self.device_name.as_bytes());
        buf.extend_from_slice(self.version.as_bytes());
        buf
    }

    /// Length of the encoded block.
    pub fn encoded_len(&self) -> usize {
        5 + self.device_name.len() + self.version.len()
    }
}

/// Packet counters kept by the slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketStatistics {
    /// Correctly received packets.
    pub correct: u32,
    /// Packets dropped because the receive buffer overflowed.
    pub buffer_overflow: u32,
    /// Packets lost mid-reception.
    pub lost: u32,
    /// Packets rejected with a checksum error.
    pub checksum_error: u32,
}

impl PacketStatistics {
    /// Decode the 16-byte statistics payload (4 x u32 LE).
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < PACKET_STATISTICS_LEN {
            return Err(WireError::ShortResponse {
                expected: PACKET_STATISTICS_LEN,
                actual: payload.len(),
            });
        }

        let word = |i: usize| {
            u32::from_le_bytes([payload[i], payload[i + 1], payload[i + 2], payload[i + 3]])
        };
        Ok(PacketStatistics {
            correct: word(0),
            buffer_overflow: word(4),
            lost: word(8),
            checksum_error: word(12),
        })
    }

    /// Encode the 16-byte statistics payload (slave side).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PACKET_STATISTICS_LEN);
        buf.put_u32_le(self.correct);
        buf.put_u32_le(self.buffer_overflow);
        buf.put_u32_le(self.lost);
        buf.put_u32_le(self.checksum_error);
        buf
    }
}

/// Static-storage geometry reported by the slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageGeometry {
    /// Total byte count.
    pub capacity: u32,
    /// Minimum erase/write unit in bytes, at least 1.
    pub page_size: u16,
}

impl StorageGeometry {
    /// Decode the 6-byte geometry payload (u32 capacity, u16 page size).
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < STORAGE_GEOMETRY_LEN {
            return Err(WireError::ShortResponse {
                expected: STORAGE_GEOMETRY_LEN,
                actual: payload.len(),
            });
        }
        Ok(StorageGeometry {
            capacity: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            page_size: u16::from_le_bytes([payload[4], payload[5]]),
        })
    }

    /// Encode the 6-byte geometry payload (slave side).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(STORAGE_GEOMETRY_LEN);
        buf.put_u32_le(self.capacity);
        buf.put_u16_le(self.page_size);
        buf
    }
}
