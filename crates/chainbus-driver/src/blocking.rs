//! Blocking façade.
//!
//! Every protocol operation is implemented exactly once as a suspendable
//! action; this module drives those actions to completion on a
//! current-thread runtime for callers that do not run inside tokio. No
//! protocol logic lives here.

use crate::backend::Backend;
use crate::bus::{Bus, TransmissionMode};
use crate::config::{BusConfig, ScanRange, SearchConfig};
use crate::device::{Device, DeviceState};
use crate::enumerate::{assign_addresses, Enumeration};
use crate::error::BusError;
use crate::locator::Locator;
use crate::search::UuidSearch;
use crate::serial::SerialBackend;
use crate::stats::{BusByteTotals, HostStatistics};
use chainbus_protocol::{DeviceInfo, ExtendedInfo, PacketStatistics, StorageGeometry};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn build_runtime() -> Result<Runtime, BusError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|_| BusError::Unspecified)
}

/// Blocking handle to one physical bus.
pub struct BlockingBus<B: Backend> {
    bus: Bus<B>,
    runtime: Arc<Runtime>,
}

impl BlockingBus<SerialBackend> {
    /// Open a bus on the serial port described by the configuration.
    pub fn open(config: &BusConfig) -> Result<Self, BusError> {
        let runtime = Arc::new(build_runtime()?);
        // The serial stream registers with the runtime's reactor.
        let bus = {
            let _guard = runtime.enter();
            Bus::open(config)?
        };
        Ok(BlockingBus { bus, runtime })
    }
}

impl<B: Backend> BlockingBus<B> {
    /// Wrap an arbitrary back-end.
    pub fn new(backend: B, config: &BusConfig) -> Result<Self, BusError> {
        Ok(BlockingBus {
            bus: Bus::new(backend, config)?,
            runtime: Arc::new(build_runtime()?),
        })
    }

    /// The underlying suspendable bus handle.
    pub fn inner(&self) -> &Bus<B> {
        &self.bus
    }

    /// Switch the transmission mode.
    pub fn set_transmission_mode(&self, mode: TransmissionMode) {
        self.runtime.block_on(self.bus.set_transmission_mode(mode));
    }

    /// Byte totals written to and read from the line.
    pub fn byte_totals(&self) -> BusByteTotals {
        self.bus.byte_totals()
    }

    /// Create a blocking handle for the slave at a unicast address.
    pub fn device(&self, address: u8) -> Result<BlockingDevice<B>, BusError> {
        Ok(BlockingDevice {
            device: self.bus.device(address)?,
            runtime: Arc::clone(&self.runtime),
        })
    }

    /// Create the blocking broadcast endpoint.
    pub fn locator(&self) -> BlockingLocator<B> {
        BlockingLocator {
            locator: self.bus.locator(),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

/// Blocking wrapper around [`Device`].
pub struct BlockingDevice<B: Backend> {
    device: Device<B>,
    runtime: Arc<Runtime>,
}

impl<B: Backend> BlockingDevice<B> {
    /// The underlying suspendable device handle.
    pub fn inner(&self) -> &Device<B> {
        &self.device
    }

    /// The bus address of this device.
    pub fn address(&self) -> u8 {
        self.device.address()
    }

    /// Snapshot of this device's transfer counters.
    pub fn statistics(&self) -> HostStatistics {
        self.device.statistics()
    }

    /// See [`Device::state`].
    pub fn state(&self) -> DeviceState {
        self.device.state()
    }

    /// See [`Device::transceive`]. This is the extension surface for
    /// profiles built on the blocking façade.
    pub fn transceive(&self, payload: &[u8], expected_len: usize) -> Result<Vec<u8>, BusError> {
        self.runtime.block_on(self.device.transceive(payload, expected_len))
    }

    /// See [`Device::transmit`].
    pub fn transmit(&self, payload: &[u8]) -> Result<(), BusError> {
        self.runtime.block_on(self.device.transmit(payload))
    }

    /// See [`Device::ping`].
    pub fn ping(&self) -> Result<(), BusError> {
        self.runtime.block_on(self.device.ping())
    }

    /// See [`Device::initialize`].
    pub fn initialize(&self) -> Result<DeviceInfo, BusError> {
        self.runtime.block_on(self.device.initialize())
    }

    /// See [`Device::info`].
    pub fn info(&self) -> Result<DeviceInfo, BusError> {
        self.device.info()
    }

    /// See [`Device::uuid`].
    pub fn uuid(&self) -> Result<u32, BusError> {
        self.device.uuid()
    }

    /// See [`Device::uptime_ticks`].
    pub fn uptime_ticks(&self) -> Result<u32, BusError> {
        self.runtime.block_on(self.device.uptime_ticks())
    }

    /// See [`Device::uptime`].
    pub fn uptime(&self) -> Result<f64, BusError> {
        self.runtime.block_on(self.device.uptime())
    }

    /// See [`Device::packet_statistics`].
    pub fn packet_statistics(&self) -> Result<PacketStatistics, BusError> {
        self.runtime.block_on(self.device.packet_statistics())
    }

    /// See [`Device::extended_info`].
    pub fn extended_info(&self) -> Result<ExtendedInfo, BusError> {
        self.runtime.block_on(self.device.extended_info())
    }

    /// See [`Device::name`].
    pub fn name(&self) -> Result<String, BusError> {
        self.runtime.block_on(self.device.name())
    }

    /// See [`Device::version`].
    pub fn version(&self) -> Result<String, BusError> {
        self.runtime.block_on(self.device.version())
    }

    /// See [`Device::storage_geometry`].
    pub fn storage_geometry(&self) -> Result<StorageGeometry, BusError> {
        self.runtime.block_on(self.device.storage_geometry())
    }

    /// See [`Device::read_storage`].
    pub fn read_storage(&self, offset: u32, len: usize) -> Result<Vec<u8>, BusError> {
        self.runtime.block_on(self.device.read_storage(offset, len))
    }

    /// See [`Device::write_storage`].
    pub fn write_storage(&self, offset: u32, data: &[u8]) -> Result<(), BusError> {
        self.runtime.block_on(self.device.write_storage(offset, data))
    }

    /// See [`Device::read_string_from_storage`].
    pub fn read_string_from_storage(
        &self,
        offset: u32,
        max_read_size: usize,
    ) -> Result<String, BusError> {
        self.runtime
            .block_on(self.device.read_string_from_storage(offset, max_read_size))
    }

    /// See [`Device::write_string_to_storage`].
    pub fn write_string_to_storage(&self, offset: u32, value: &str) -> Result<(), BusError> {
        self.runtime
            .block_on(self.device.write_string_to_storage(offset, value))
    }
}

/// Blocking wrapper around [`Locator`].
pub struct BlockingLocator<B: Backend> {
    locator: Locator<B>,
    runtime: Arc<Runtime>,
}

impl<B: Backend> BlockingLocator<B> {
    /// Snapshot of this locator's transfer counters.
    pub fn statistics(&self) -> HostStatistics {
        self.locator.statistics()
    }

    /// See [`Locator::broadcast_ping`].
    pub fn broadcast_ping(&self) -> Result<u32, BusError> {
        self.runtime.block_on(self.locator.broadcast_ping())
    }

    /// See [`Locator::set_bus_address`].
    pub fn set_bus_address(&self, uuid: u32, address: u8) -> Result<(), BusError> {
        self.runtime.block_on(self.locator.set_bus_address(uuid, address))
    }

    /// See [`Locator::read_bus_address`].
    pub fn read_bus_address(&self, uuid: u32) -> Result<u8, BusError> {
        self.runtime.block_on(self.locator.read_bus_address(uuid))
    }

    /// See [`Locator::reset_bus_address`].
    pub fn reset_bus_address(&self, uuid: u32) -> Result<(), BusError> {
        self.runtime.block_on(self.locator.reset_bus_address(uuid))
    }

    /// See [`Locator::reset_all_bus_addresses`].
    pub fn reset_all_bus_addresses(&self) -> Result<(), BusError> {
        self.runtime.block_on(self.locator.reset_all_bus_addresses())
    }

    /// See [`Locator::enable_bus_neighbours`].
    pub fn enable_bus_neighbours(&self) -> Result<(), BusError> {
        self.runtime.block_on(self.locator.enable_bus_neighbours())
    }

    /// See [`Locator::disable_bus_neighbours`].
    pub fn disable_bus_neighbours(&self) -> Result<(), BusError> {
        self.runtime.block_on(self.locator.disable_bus_neighbours())
    }

    /// See [`Locator::sleep_all`].
    pub fn sleep_all(&self) -> Result<(), BusError> {
        self.runtime.block_on(self.locator.sleep_all())
    }

    /// See [`Locator::scan_bus_addresses`].
    pub fn scan_bus_addresses(
        &self,
        range: ScanRange,
        stop_on_missing: bool,
    ) -> Result<Vec<u8>, BusError> {
        self.runtime
            .block_on(self.locator.scan_bus_addresses(range, stop_on_missing))
    }

    /// Run the binary UUID search to completion.
    pub fn find_all_devices(&self, config: SearchConfig) -> Result<Vec<u32>, BusError> {
        self.runtime.block_on(async {
            UuidSearch::new(&self.locator, config).find_all_devices().await
        })
    }

    /// See [`assign_addresses`].
    pub fn assign_addresses(
        &self,
        use_sequential: bool,
        use_binary: bool,
    ) -> Result<Enumeration, BusError> {
        self.runtime
            .block_on(assign_addresses(&self.locator, use_sequential, use_binary))
    }
}
