//! Protocol constants
//!
//! These constants define the opcode bytes, address ranges, and frame
//! geometry of the chainbus wire protocol.

// ============================================================================
// Addressing
// ============================================================================

/// Address reserved for broadcast frames.
pub const BROADCAST_ADDRESS: u8 = 0x00;
/// Lowest valid unicast address.
pub const MIN_UNICAST_ADDRESS: u8 = 1;
/// Highest valid unicast address (also the upper scan bound).
pub const MAX_UNICAST_ADDRESS: u8 = 127;

// ============================================================================
// Device-info command family (unicast, leading byte)
// ============================================================================

/// Leading byte that marks the device-info command family.
pub const CMD_FAMILY_INFO: u8 = 0x00;

/// Read the device name string (legacy packet layout).
pub const INFO_OP_NAME: u8 = 0x00;
/// Read the uptime tick counter.
pub const INFO_OP_UPTIME: u8 = 0x01;
/// Read the version string (legacy packet layout).
pub const INFO_OP_VERSION: u8 = 0x02;
/// Read the slave-side packet statistics counters.
pub const INFO_OP_STATISTICS: u8 = 0x07;
/// Read the UUID (legacy devices only; extended packets carry it inline).
pub const INFO_OP_UUID: u8 = 0x09;
/// Read the extended info block (extended packet layout).
pub const INFO_OP_EXTENDED_INFO: u8 = 0x0A;
/// Read static-storage capacity and page size.
pub const INFO_OP_STORAGE_GEOMETRY: u8 = 0x0B;
/// Read from static storage.
pub const INFO_OP_STORAGE_READ: u8 = 0x0C;
/// Write to static storage.
pub const INFO_OP_STORAGE_WRITE: u8 = 0x0D;

// ============================================================================
// Broadcast sub-operations (second byte after the 0x00 family byte)
// ============================================================================

/// Address management: who-is-there, ping/read/set/reset by UUID.
pub const BCAST_OP_ADDRESS: u8 = 0x00;
/// Enable bus-neighbor links.
pub const BCAST_OP_ENABLE_NEIGHBOURS: u8 = 0x01;
/// Disable bus-neighbor links (isolates each device between the two).
pub const BCAST_OP_DISABLE_NEIGHBOURS: u8 = 0x02;
/// Reset all bus addresses.
pub const BCAST_OP_RESET_ALL: u8 = 0x03;
/// Request a bus assertion from every matching device.
pub const BCAST_OP_ASSERT: u8 = 0x04;
/// Request a bus assertion from matching devices without an address.
pub const BCAST_OP_ASSERT_UNADDRESSED: u8 = 0x05;
/// Put all devices to sleep.
pub const BCAST_OP_SLEEP: u8 = 0x06;

/// Tail byte selecting the read/set address form of [`BCAST_OP_ADDRESS`].
pub const ADDRESS_TAIL_ASSIGN: u8 = 0x00;
/// Tail byte selecting the reset-address form of [`BCAST_OP_ADDRESS`].
pub const ADDRESS_TAIL_RESET: u8 = 0x01;

// ============================================================================
// Storage status codes
// ============================================================================

/// Storage operation completed.
pub const STORAGE_STATUS_OK: u8 = 0;
/// Offset or size was rejected by the device.
pub const STORAGE_STATUS_ADDRESS_SIZE: u8 = 1;

// ============================================================================
// Frame geometry
// ============================================================================

/// Bytes a frame adds around its payload (address + CRC).
pub const FRAME_OVERHEAD: usize = 2;
/// Shortest decodable frame: one address byte and one CRC byte.
pub const MIN_FRAME_LEN: usize = 2;

/// Length of the basic DeviceInfo response payload.
pub const BASIC_INFO_LEN: usize = 11;
/// Length of the packet-statistics response payload (4 x u32).
pub const PACKET_STATISTICS_LEN: usize = 16;
/// Length of the storage-geometry response payload (u32 + u16).
pub const STORAGE_GEOMETRY_LEN: usize = 6;

/// Request bytes around the data slice of a storage write, including the
/// frame overhead: address + family + opcode + offset + CRC.
pub const STORAGE_WRITE_OVERHEAD: usize = 8;
/// Response bytes around the data slice of a storage read: address +
/// status + CRC.
pub const STORAGE_READ_OVERHEAD: usize = 3;

// ============================================================================
// UUID search
// ============================================================================

/// Widest prefix mask: a 32-bit UUID is fully specified.
pub const MAX_SEARCH_LEVEL: u8 = 32;
/// Pseudo-level marking a fully matched UUID (a leaf of the prefix tree).
pub const SEARCH_LEAF_LEVEL: u8 = 33;
