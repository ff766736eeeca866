//! Broadcast-only bus operations.
//!
//! Every locator operation is a frame to the broadcast address `0x00`:
//! address assignment, neighbor control, the assertion selector used by
//! the binary UUID search, and bus scans.

use crate::backend::Backend;
use crate::bus::Bus;
use crate::config::ScanRange;
use crate::error::BusError;
use crate::stats::{HostCounters, HostStatistics};
use chainbus_protocol::{
    BroadcastRequest, DeviceRequest, SearchAddress, MAX_UNICAST_ADDRESS, MIN_UNICAST_ADDRESS,
};
use tracing::{debug, trace};

/// Broadcast endpoint of one bus.
pub struct Locator<B: Backend> {
    bus: Bus<B>,
    counters: HostCounters,
}

impl<B: Backend> Bus<B> {
    /// Create the broadcast endpoint for this bus.
    pub fn locator(&self) -> Locator<B> {
        Locator {
            bus: self.clone(),
            counters: HostCounters::new(),
        }
    }
}

impl<B: Backend> Locator<B> {
    /// Snapshot of this locator's transfer counters.
    pub fn statistics(&self) -> HostStatistics {
        self.counters.snapshot()
    }

    async fn broadcast(&self, request: BroadcastRequest) -> Result<(), BusError> {
        self.bus
            .transmit(chainbus_protocol::BROADCAST_ADDRESS, &request.encode(), &self.counters)
            .await
    }

    /// "Who-is-there": address the unique unaddressed device; it replies
    /// with its UUID. Silence means no unaddressed device is reachable.
    pub async fn broadcast_ping(&self) -> Result<u32, BusError> {
        let reply = self
            .bus
            .broadcast_transceive(&BroadcastRequest::WhoIsThere.encode(), 4, &self.counters)
            .await?;
        Ok(u32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]))
    }

    /// Ping one device by UUID. Fire-and-forget.
    pub async fn ping_uuid(&self, uuid: u32) -> Result<(), BusError> {
        self.broadcast(BroadcastRequest::PingUuid { uuid }).await
    }

    /// Read the bus address currently assigned to a UUID.
    pub async fn read_bus_address(&self, uuid: u32) -> Result<u8, BusError> {
        let reply = self
            .bus
            .broadcast_transceive(
                &BroadcastRequest::ReadBusAddress { uuid }.encode(),
                1,
                &self.counters,
            )
            .await?;
        Ok(reply[0])
    }

    /// Assign a bus address to a UUID. The device acknowledges with 1;
    /// an explicit 0 means it refused the address.
    pub async fn set_bus_address(&self, uuid: u32, address: u8) -> Result<(), BusError> {
        if !(MIN_UNICAST_ADDRESS..=MAX_UNICAST_ADDRESS).contains(&address) {
            return Err(BusError::InvalidArgument(format!(
                "bus address {} outside [{}, {}]",
                address, MIN_UNICAST_ADDRESS, MAX_UNICAST_ADDRESS
            )));
        }

        let reply = self
            .bus
            .broadcast_transceive(
                &BroadcastRequest::SetBusAddress { uuid, address }.encode(),
                1,
                &self.counters,
            )
            .await?;
        if reply[0] != 1 {
            return Err(BusError::DeviceRejectedBusAddress);
        }
        debug!(uuid = format_args!("{:08X}", uuid), address, "bus address assigned");
        Ok(())
    }

    /// Reset one device's address to none.
    pub async fn reset_bus_address(&self, uuid: u32) -> Result<(), BusError> {
        self.broadcast(BroadcastRequest::ResetBusAddress { uuid }).await
    }

    /// Enable bus-neighbor links, bringing the next device in each
    /// physical chain online.
    pub async fn enable_bus_neighbours(&self) -> Result<(), BusError> {
        self.broadcast(BroadcastRequest::EnableNeighbours).await
    }

    /// Disable bus-neighbor links, isolating each device between the two.
    pub async fn disable_bus_neighbours(&self) -> Result<(), BusError> {
        self.broadcast(BroadcastRequest::DisableNeighbours).await
    }

    /// Reset every device's bus address.
    pub async fn reset_all_bus_addresses(&self) -> Result<(), BusError> {
        self.broadcast(BroadcastRequest::ResetAllAddresses).await
    }

    /// Put all devices to sleep.
    pub async fn sleep_all(&self) -> Result<(), BusError> {
        self.broadcast(BroadcastRequest::Sleep).await
    }

    /// Ask every device matching the prefix to assert the bus.
    ///
    /// `Ok` or a reception error means at least one device pulsed the
    /// line; [`BusError::NoAssertionDetected`] means none did. The
    /// error-equals-match interpretation lives in the search module, not
    /// here.
    pub async fn request_bus_assertion(
        &self,
        target: SearchAddress,
        only_unaddressed: bool,
    ) -> Result<(), BusError> {
        let request = BroadcastRequest::RequestAssertion {
            target,
            only_unaddressed,
        };
        self.bus
            .broadcast_transceive(&request.encode(), 0, &self.counters)
            .await
            .map(|_| ())
    }

    /// Sequentially ping every address in the range and collect the
    /// responders, in ascending order. With `stop_on_missing` the scan
    /// stops at the first silent address so the result is a gap-free
    /// prefix that mirrors bus order.
    pub async fn scan_bus_addresses(
        &self,
        range: ScanRange,
        stop_on_missing: bool,
    ) -> Result<Vec<u8>, BusError> {
        let mut responders = Vec::new();
        for address in range.addresses() {
            let ping = DeviceRequest::Ping.encode();
            match self.bus.transceive(address, &ping, 0, &self.counters).await {
                Ok(_) => {
                    trace!(address, "scan: responder");
                    responders.push(address);
                }
                Err(err) if err.is_transport() => {
                    trace!(address, "scan: no response");
                    if stop_on_missing {
                        break;
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(responders)
    }
}
