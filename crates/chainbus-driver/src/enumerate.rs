//! End-to-end address assignment.
//!
//! Assigns contiguous bus addresses starting at 1, preferring the
//! sequential neighbor-chaining walk (which yields a list mirroring the
//! physical topology) and falling back to the binary UUID search for
//! devices that lack neighbor control.

use crate::backend::Backend;
use crate::config::SearchConfig;
use crate::error::BusError;
use crate::locator::Locator;
use crate::search::UuidSearch;
use tracing::{debug, info};

/// Result of an address-assignment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Discovered UUIDs, in assignment order: the device with
    /// `devices[i]` holds bus address `i + 1`.
    pub devices: Vec<u32>,
    /// Whether the list order mirrors the physical bus topology. The
    /// binary search discovers devices in prefix order, so any device
    /// found through it clears this flag.
    pub order_known: bool,
}

/// Assign contiguous bus addresses starting at 1.
///
/// With `use_sequential` the devices are enumerated by neighbor chaining:
/// each device exposes its successor only after being addressed, so the
/// result preserves bus order. With `use_binary` the prefix-tree search
/// covers devices without neighbor control — as the only strategy, or as
/// a fallback interleaved with the sequential walk.
pub async fn assign_addresses<B: Backend>(
    locator: &Locator<B>,
    use_sequential: bool,
    use_binary: bool,
) -> Result<Enumeration, BusError> {
    if !use_sequential && !use_binary {
        return Err(BusError::InvalidArgument(
            "at least one discovery strategy must be enabled".into(),
        ));
    }

    locator.reset_all_bus_addresses().await?;

    let mut devices: Vec<u32> = Vec::new();
    let mut order_known = true;

    if !use_sequential {
        // Pure binary enumeration: discovery order is prefix order, not
        // bus order.
        let mut search = UuidSearch::new(locator, SearchConfig::default());
        for uuid in search.find_all_devices().await? {
            locator.set_bus_address(uuid, (devices.len() + 1) as u8).await?;
            devices.push(uuid);
        }
        info!(count = devices.len(), "binary enumeration complete");
        return Ok(Enumeration {
            devices,
            order_known: false,
        });
    }

    locator.disable_bus_neighbours().await?;

    loop {
        match locator.broadcast_ping().await {
            Ok(uuid) => {
                locator.set_bus_address(uuid, (devices.len() + 1) as u8).await?;
                devices.push(uuid);
                debug!(
                    uuid = format_args!("{:08X}", uuid),
                    address = devices.len(),
                    "sequential discovery"
                );
                // Bring the next physical neighbor online.
                locator.enable_bus_neighbours().await?;
            }
            Err(_) if !use_binary => {
                // No fallback available: the walk is over, return what
                // the chain yielded.
                break;
            }
            Err(_) => {
                // At least one reachable device does not answer the
                // neighbor-chain ping; sweep the unaddressed residue with
                // the prefix-tree search.
                let mut search =
                    UuidSearch::new(locator, SearchConfig::default().only_unaddressed());
                let found = search.find_all_devices().await?;
                if found.is_empty() {
                    // Nothing left unaddressed: the bus is exhausted.
                    break;
                }
                order_known = false;
                for uuid in found {
                    locator.set_bus_address(uuid, (devices.len() + 1) as u8).await?;
                    devices.push(uuid);
                    debug!(
                        uuid = format_args!("{:08X}", uuid),
                        address = devices.len(),
                        "fallback discovery"
                    );
                    locator.enable_bus_neighbours().await?;
                }
                // Newly enabled neighbors may answer the chain ping now.
            }
        }
    }

    info!(count = devices.len(), order_known, "enumeration complete");
    Ok(Enumeration {
        devices,
        order_known,
    })
}
