//! Transport engine tests: framing on the wire, retry classification,
//! statistics bookkeeping, and transmission modes.

mod common;

use chainbus_driver::{Bus, BusConfig, BusError, TransmissionMode};
use chainbus_protocol::frame;
use common::{Reply, ScriptedBackend, Step};

fn test_config() -> BusConfig {
    // Zero processing time keeps the scripted tests free of pacing.
    BusConfig::new("sim", 1_000_000)
        .with_device_processing_time(std::time::Duration::ZERO)
}

// ============================================================================
// Scenario: basic ping
// ============================================================================

#[tokio::test]
async fn test_ping_success() {
    // A ping is the two-byte frame `addr || crc`, echoed verbatim.
    let wire = frame::encode(5, &[]);
    let backend = ScriptedBackend::new(vec![Step::new(wire.clone(), Reply::Raw(wire))]);

    let bus = Bus::new(backend.clone(), &test_config()).unwrap();
    let device = bus.device(5).unwrap();

    device.ping().await.expect("ping should succeed");

    let stats = device.statistics();
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.failed_attempts(), 0);
    assert!(backend.is_exhausted());
}

// ============================================================================
// Scenario: retry classification
// ============================================================================

#[tokio::test]
async fn test_two_corrupt_replies_then_success() {
    let request = frame::encode(5, &[]);
    let good = frame::encode(5, &[]);
    let mut bad = good.clone();
    bad[1] ^= 0xFF;

    let backend = ScriptedBackend::new(vec![
        Step::new(request.clone(), Reply::Raw(bad.clone())),
        Step::new(request.clone(), Reply::Raw(bad)),
        Step::new(request, Reply::Raw(good)),
    ]);

    let bus = Bus::new(backend.clone(), &test_config()).unwrap();
    let device = bus.device(5).unwrap();

    device.ping().await.expect("third attempt should succeed");

    let stats = device.statistics();
    assert_eq!(stats.checksum_errors, 2);
    assert_eq!(stats.successes, 1);
    // One success plus the failed attempts accounts for all three tries.
    assert_eq!(stats.failed_attempts(), 2);
    // The input buffer is cleared before every attempt.
    assert_eq!(backend.clear_count(), 3);
}

#[tokio::test]
async fn test_three_silent_attempts_surface_no_answer() {
    let request = frame::encode(9, &[]);
    let backend = ScriptedBackend::new(vec![
        Step::new(request.clone(), Reply::Silence),
        Step::new(request.clone(), Reply::Silence),
        Step::new(request, Reply::Silence),
    ]);

    let bus = Bus::new(backend.clone(), &test_config()).unwrap();
    let device = bus.device(9).unwrap();

    let err = device.ping().await.expect_err("should fail");
    assert_eq!(err, BusError::TransportReceptionNoAnswer);
    assert_eq!(device.statistics().no_answer, 3);
    assert_eq!(device.statistics().successes, 0);
}

#[tokio::test]
async fn test_partial_reply_classified_as_missing_data() {
    let request = frame::encode(3, &[0x00]);
    let reply = frame::encode(3, &[0u8; 11]);
    let backend = ScriptedBackend::new(vec![
        Step::new(request.clone(), Reply::Raw(reply[..4].to_vec())),
        Step::new(request.clone(), Reply::Raw(reply[..4].to_vec())),
        Step::new(request, Reply::Raw(reply[..4].to_vec())),
    ]);

    let bus = Bus::new(backend, &test_config()).unwrap();
    let device = bus.device(3).unwrap();

    let err = device.transceive(&[0x00], 11).await.expect_err("should fail");
    assert_eq!(err, BusError::TransportReceptionMissingData);
    assert_eq!(device.statistics().missing_data, 3);
}

#[tokio::test]
async fn test_write_failure_classified_as_transmission_error() {
    let request = frame::encode(4, &[]);
    let backend = ScriptedBackend::new(vec![
        Step::new(request.clone(), Reply::WriteFail),
        Step::new(request.clone(), Reply::WriteFail),
        Step::new(request, Reply::WriteFail),
    ]);

    let bus = Bus::new(backend, &test_config()).unwrap();
    let device = bus.device(4).unwrap();

    let err = device.ping().await.expect_err("should fail");
    assert_eq!(err, BusError::TransportTransmission);
    assert_eq!(device.statistics().transmit_errors, 3);
}

#[tokio::test]
async fn test_reply_from_wrong_address_rejected() {
    let request = frame::encode(5, &[]);
    let backend = ScriptedBackend::new(vec![
        Step::new(request.clone(), Reply::Frame(6, vec![])),
        Step::new(request.clone(), Reply::Frame(6, vec![])),
        Step::new(request, Reply::Frame(6, vec![])),
    ]);

    let bus = Bus::new(backend, &test_config()).unwrap();
    let device = bus.device(5).unwrap();

    let err = device.ping().await.expect_err("should fail");
    assert_eq!(err, BusError::TransportChecksum);
}

// ============================================================================
// Addressing bounds
// ============================================================================

#[tokio::test]
async fn test_device_address_bounds() {
    let bus = Bus::new(ScriptedBackend::default(), &test_config()).unwrap();
    assert!(matches!(bus.device(0), Err(BusError::InvalidArgument(_))));
    assert!(matches!(bus.device(128), Err(BusError::InvalidArgument(_))));
    assert!(bus.device(1).is_ok());
    assert!(bus.device(127).is_ok());
}

// ============================================================================
// Transmission modes
// ============================================================================

#[tokio::test]
async fn test_transmit_only_synthesizes_reply() {
    let request = frame::encode(5, &[]);
    // Only the write is scripted: no read happens.
    let backend = ScriptedBackend::new(vec![Step::new(request.clone(), Reply::Silence)]);

    let bus = Bus::new(backend.clone(), &test_config()).unwrap();
    bus.set_transmission_mode(TransmissionMode::TransmitOnly).await;
    let device = bus.device(5).unwrap();

    device.ping().await.expect("transmit-only ping succeeds");
    assert!(backend.is_exhausted());

    // The pretend response is charged against the receive totals.
    let totals = bus.byte_totals();
    assert_eq!(totals.tx_bytes, request.len() as u64);
    assert_eq!(totals.rx_bytes, request.len() as u64);
}

#[tokio::test]
async fn test_receive_only_skips_the_write() {
    // No write step scripted: a transmit would panic the script.
    let backend = ScriptedBackend::new(vec![]);
    let bus = Bus::new(backend, &test_config()).unwrap();
    bus.set_transmission_mode(TransmissionMode::ReceiveOnly).await;

    let device = bus.device(5).unwrap();
    // With nothing on the line the read classifies as no-answer.
    let err = device.ping().await.expect_err("nothing to read");
    assert_eq!(err, BusError::TransportReceptionNoAnswer);

    assert_eq!(bus.byte_totals().tx_bytes, 0);
}

// ============================================================================
// Broadcast path
// ============================================================================

#[tokio::test]
async fn test_broadcast_silence_is_single_attempt() {
    let request = frame::encode(0, &[0x00, 0x00]);
    // Exactly one step: a second attempt would panic the script.
    let backend = ScriptedBackend::new(vec![Step::new(request, Reply::Silence)]);

    let bus = Bus::new(backend.clone(), &test_config()).unwrap();
    let locator = bus.locator();

    let err = locator.broadcast_ping().await.expect_err("no device answers");
    assert_eq!(err, BusError::NoAssertionDetected);
    assert!(backend.is_exhausted());
}

#[tokio::test]
async fn test_broadcast_ping_returns_uuid() {
    let request = frame::encode(0, &[0x00, 0x00]);
    let backend = ScriptedBackend::new(vec![Step::new(
        request,
        Reply::Frame(0, 0x11223344u32.to_le_bytes().to_vec()),
    )]);

    let bus = Bus::new(backend, &test_config()).unwrap();
    let locator = bus.locator();

    let uuid = locator.broadcast_ping().await.expect("uuid reply");
    assert_eq!(uuid, 0x11223344);
    assert_eq!(locator.statistics().successes, 1);
}
