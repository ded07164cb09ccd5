//! Factory reset tests

use std::time::Duration;

use titan_deployer::deploy::{ResetOptions, Resetter, RESET_COMMAND};
use titan_deployer::status::{StatusLevel, StatusSink};

use crate::common::{target, FakeDevice, Reply};

fn resetter(device: &FakeDevice) -> Resetter<FakeDevice> {
    Resetter::new(
        device.clone(),
        ResetOptions {
            settle_delay: Duration::from_millis(10),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_disconnect_after_reset_is_success() {
    let device = FakeDevice::new().reply(RESET_COMMAND, Reply::Disconnect);
    let outcome = resetter(&device)
        .factory_reset(&target("192.168.88.1"), StatusSink::disabled())
        .await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(
        device.commands(),
        vec!["/system reset-configuration no-defaults=yes skip-backup=yes".to_string()]
    );
    assert_eq!(device.closes(), 1);
    let messages: Vec<&str> = outcome.trace.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Connecting to 192.168.88.1 for Reset...",
            "Sending Reset Command (Nuke & Pave)...",
            "Reset command sent. Router is rebooting.",
        ]
    );
}

#[tokio::test]
async fn test_io_error_after_reset_is_success() {
    let device = FakeDevice::new().reply(RESET_COMMAND, Reply::Io);
    let outcome = resetter(&device)
        .factory_reset(&target("192.168.88.1"), StatusSink::disabled())
        .await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_clean_return_is_success() {
    let device = FakeDevice::new();
    let outcome = resetter(&device)
        .factory_reset(&target("192.168.88.1"), StatusSink::disabled())
        .await;
    assert!(outcome.success);
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn test_connection_failure_is_failure() {
    let device = FakeDevice::unreachable();
    let outcome = resetter(&device)
        .factory_reset(&target("192.168.88.1"), StatusSink::disabled())
        .await;

    assert!(!outcome.success);
    assert!(device.commands().is_empty());
    let last = outcome.trace.last().unwrap();
    assert_eq!(last.level, StatusLevel::Error);
    assert!(last.message.starts_with("Reset Failed: "));
    assert!(last.message.contains("connection refused"));
}

#[tokio::test]
async fn test_unexpected_session_error_is_failure() {
    let device = FakeDevice::new().reply(RESET_COMMAND, Reply::Closed);
    let outcome = resetter(&device)
        .factory_reset(&target("192.168.88.1"), StatusSink::disabled())
        .await;

    assert!(!outcome.success);
    assert_eq!(device.closes(), 1);
}
