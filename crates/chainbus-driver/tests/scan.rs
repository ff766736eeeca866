//! Bus scan tests.

mod common;

use chainbus_driver::{Bus, BusConfig, BusError, ScanRange};
use common::{SimBus, SimSlave};
use std::time::Duration;

fn test_config() -> BusConfig {
    BusConfig::new("sim", 1_000_000).with_device_processing_time(Duration::ZERO)
}

fn bus_with_addresses(addresses: &[u8]) -> Bus<SimBus> {
    let slaves = addresses
        .iter()
        .enumerate()
        .map(|(i, &a)| SimSlave::new(0x1000 + i as u32).with_address(a))
        .collect();
    Bus::new(SimBus::new(slaves), &test_config()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_scan_returns_sorted_responders() {
    let bus = bus_with_addresses(&[6, 3, 5]);
    let locator = bus.locator();

    let found = locator
        .scan_bus_addresses(ScanRange::new(1, 10).unwrap(), false)
        .await
        .expect("scan");
    // A sorted subset of the range, gaps preserved.
    assert_eq!(found, vec![3, 5, 6]);
}

#[tokio::test(start_paused = true)]
async fn test_scan_stop_on_missing_yields_gapless_prefix() {
    let bus = bus_with_addresses(&[1, 2, 3, 5]);
    let locator = bus.locator();

    let found = locator
        .scan_bus_addresses(ScanRange::new(1, 10).unwrap(), true)
        .await
        .expect("scan");
    // Address 4 is silent: the scan stops there and never sees 5.
    assert_eq!(found, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_scan_stop_on_missing_empty_when_first_is_silent() {
    let bus = bus_with_addresses(&[2, 3]);
    let locator = bus.locator();

    let found = locator
        .scan_bus_addresses(ScanRange::new(1, 5).unwrap(), true)
        .await
        .expect("scan");
    assert!(found.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scan_empty_bus() {
    let bus = bus_with_addresses(&[]);
    let locator = bus.locator();

    let found = locator
        .scan_bus_addresses(ScanRange::new(1, 16).unwrap(), false)
        .await
        .expect("scan");
    assert!(found.is_empty());
}

#[test]
fn test_scan_range_rejects_broadcast_address() {
    assert!(matches!(ScanRange::new(0, 10), Err(BusError::InvalidArgument(_))));
}
