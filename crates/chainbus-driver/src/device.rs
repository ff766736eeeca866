//! Per-slave device handle and the generic device protocol.

use crate::backend::Backend;
use crate::bus::Bus;
use crate::error::BusError;
use crate::stats::{HostCounters, HostStatistics};
use chainbus_protocol::{
    DeviceInfo, DeviceRequest, ExtendedInfo, InfoLayout, PacketStatistics, BASIC_INFO_LEN,
    MAX_UNICAST_ADDRESS, MIN_UNICAST_ADDRESS, PACKET_STATISTICS_LEN,
};
use std::sync::RwLock;
use tracing::debug;

/// What the host knows about a slave.
///
/// `Info` is populated once and becomes read-only; `ExtendedInfo` is
/// populated at most once on demand. Operations declare their required
/// minimum state by failing with [`BusError::DeviceNotInitialized`].
#[derive(Debug, Clone)]
pub enum DeviceState {
    /// Nothing fetched yet.
    Uninitialized,
    /// The basic info packet (and the UUID) are known.
    BasicKnown {
        /// Basic device information.
        info: DeviceInfo,
        /// Device UUID; 0 when a legacy device failed the auxiliary
        /// UUID request.
        uuid: u32,
    },
    /// Basic and extended information are known.
    ExtendedKnown {
        /// Basic device information.
        info: DeviceInfo,
        /// Device UUID.
        uuid: u32,
        /// Extended device information.
        extended: ExtendedInfo,
    },
}

/// A slave on the bus, identified by its unicast address.
pub struct Device<B: Backend> {
    bus: Bus<B>,
    address: u8,
    state: RwLock<DeviceState>,
    counters: HostCounters,
}

impl<B: Backend> Bus<B> {
    /// Create a handle for the slave at a unicast address.
    pub fn device(&self, address: u8) -> Result<Device<B>, BusError> {
        if !(MIN_UNICAST_ADDRESS..=MAX_UNICAST_ADDRESS).contains(&address) {
            return Err(BusError::InvalidArgument(format!(
                "device address {} outside [{}, {}]",
                address, MIN_UNICAST_ADDRESS, MAX_UNICAST_ADDRESS
            )));
        }
        Ok(Device {
            bus: self.clone(),
            address,
            state: RwLock::new(DeviceState::Uninitialized),
            counters: HostCounters::new(),
        })
    }
}

impl<B: Backend> Device<B> {
    /// The bus address of this device.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Snapshot of this device's transfer counters.
    pub fn statistics(&self) -> HostStatistics {
        self.counters.snapshot()
    }

    /// Current knowledge about the device.
    pub fn state(&self) -> DeviceState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Exchange a raw request for a response. This is the extension
    /// surface for device profiles layering their own opcode maps.
    pub async fn transceive(
        &self,
        payload: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>, BusError> {
        self.bus
            .transceive(self.address, payload, expected_len, &self.counters)
            .await
    }

    /// Send a raw request that expects no response.
    pub async fn transmit(&self, payload: &[u8]) -> Result<(), BusError> {
        self.bus.transmit(self.address, payload, &self.counters).await
    }

    /// Liveness check: the shortest valid frame, echoed back empty.
    pub async fn ping(&self) -> Result<(), BusError> {
        self.transceive(&DeviceRequest::Ping.encode(), 0).await.map(|_| ())
    }

    /// Fetch the basic info packet and the UUID. Further calls return the
    /// cached packet: info is populated once and then read-only.
    pub async fn initialize(&self) -> Result<DeviceInfo, BusError> {
        if let DeviceState::BasicKnown { info, .. } | DeviceState::ExtendedKnown { info, .. } =
            self.state()
        {
            return Ok(info);
        }

        let payload = self
            .transceive(&DeviceRequest::BasicInfo.encode(), BASIC_INFO_LEN)
            .await?;
        let info = DeviceInfo::decode(&payload)?;

        let uuid = match info.layout {
            InfoLayout::Extended { uuid, .. } => uuid,
            InfoLayout::Legacy { .. } => {
                // Legacy devices answer a dedicated UUID request; some very
                // old ones do not implement it. Report 0 instead of failing.
                match self.transceive(&DeviceRequest::Uuid.encode(), 4).await {
                    Ok(bytes) if bytes.len() >= 4 => {
                        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
                    }
                    Ok(_) | Err(_) => {
                        debug!(address = self.address, "legacy UUID request failed, reporting 0");
                        0
                    }
                }
            }
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, DeviceState::Uninitialized) {
            *state = DeviceState::BasicKnown { info, uuid };
        }
        Ok(info)
    }

    /// The cached basic info packet.
    pub fn info(&self) -> Result<DeviceInfo, BusError> {
        match self.state() {
            DeviceState::BasicKnown { info, .. } | DeviceState::ExtendedKnown { info, .. } => {
                Ok(info)
            }
            DeviceState::Uninitialized => Err(BusError::DeviceNotInitialized),
        }
    }

    /// The cached device UUID.
    pub fn uuid(&self) -> Result<u32, BusError> {
        match self.state() {
            DeviceState::BasicKnown { uuid, .. } | DeviceState::ExtendedKnown { uuid, .. } => {
                Ok(uuid)
            }
            DeviceState::Uninitialized => Err(BusError::DeviceNotInitialized),
        }
    }

    /// Read the raw uptime tick counter.
    pub async fn uptime_ticks(&self) -> Result<u32, BusError> {
        let info = self.info()?;
        if info.uptime_frequency == 0 {
            return Err(BusError::DeviceUptimeNotSupported);
        }
        let bytes = self.transceive(&DeviceRequest::Uptime.encode(), 4).await?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read the uptime in seconds (`ticks / uptime_frequency`).
    pub async fn uptime(&self) -> Result<f64, BusError> {
        let info = self.info()?;
        let ticks = self.uptime_ticks().await?;
        Ok(f64::from(ticks) / f64::from(info.uptime_frequency))
    }

    /// Read the slave-side packet counters.
    pub async fn packet_statistics(&self) -> Result<PacketStatistics, BusError> {
        let info = self.info()?;
        if !info.statistics_available {
            return Err(BusError::DeviceStatisticsNotSupported);
        }
        let bytes = self
            .transceive(&DeviceRequest::Statistics.encode(), PACKET_STATISTICS_LEN)
            .await?;
        Ok(PacketStatistics::decode(&bytes)?)
    }

    /// Fetch the extended info, populating it at most once. Legacy
    /// devices need two string reads; extended devices answer with one
    /// self-describing block.
    pub async fn extended_info(&self) -> Result<ExtendedInfo, BusError> {
        let (info, uuid) = match self.state() {
            DeviceState::ExtendedKnown { extended, .. } => return Ok(extended),
            DeviceState::BasicKnown { info, uuid } => (info, uuid),
            DeviceState::Uninitialized => return Err(BusError::DeviceNotInitialized),
        };

        let extended = match info.layout {
            InfoLayout::Extended {
                extended_info_length,
                ..
            } => {
                let block = self
                    .transceive(
                        &DeviceRequest::ExtendedInfo.encode(),
                        extended_info_length as usize,
                    )
                    .await?;
                ExtendedInfo::decode(&block)?
            }
            InfoLayout::Legacy {
                buffer_size,
                name_length,
                version_length,
            } => {
                let name = self
                    .transceive(&DeviceRequest::Name.encode(), name_length as usize)
                    .await?;
                let version = self
                    .transceive(&DeviceRequest::Version.encode(), version_length as usize)
                    .await?;
                ExtendedInfo {
                    device_name: String::from_utf8(name)
                        .map_err(|_| BusError::Unspecified)?,
                    version: String::from_utf8(version)
                        .map_err(|_| BusError::Unspecified)?,
                    buffer_size,
                }
            }
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let DeviceState::BasicKnown { .. } = *state {
            *state = DeviceState::ExtendedKnown {
                info,
                uuid,
                extended: extended.clone(),
            };
        }
        Ok(extended)
    }

    /// The device name.
    pub async fn name(&self) -> Result<String, BusError> {
        Ok(self.extended_info().await?.device_name)
    }

    /// The firmware version string.
    pub async fn version(&self) -> Result<String, BusError> {
        Ok(self.extended_info().await?.version)
    }

    /// Largest frame the slave accepts, including address and CRC bytes.
    pub async fn buffer_size(&self) -> Result<u16, BusError> {
        Ok(self.extended_info().await?.buffer_size)
    }
}
