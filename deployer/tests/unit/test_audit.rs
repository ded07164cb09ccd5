//! Compliance audit tests

use std::time::Duration;

use titan_deployer::audit::{run_compliance_scan, CheckStatus};

use crate::common::{target, FakeDevice, Reply};

fn hardened_device() -> FakeDevice {
    FakeDevice::new()
        .reply("/user print", Reply::stdout("0"))
        .reply("/ip service print count-only where name=\"telnet\"", Reply::stdout("0"))
        .reply("/ip service print count-only where name=\"www\"", Reply::stdout("0"))
        .reply("/ip dns get", Reply::stdout("false"))
        .reply("/ip firewall filter print", Reply::stdout("4"))
}

#[tokio::test]
async fn test_hardened_device_passes() {
    let device = hardened_device();
    let report = run_compliance_scan(&device, &target("192.168.88.1"), Duration::from_secs(5)).await;

    assert!(report.passed);
    assert!(report.error.is_none());
    assert_eq!(report.target_ip, "192.168.88.1");
    assert_eq!(report.checks.len(), 4);
    assert!(report.checks.iter().all(|c| c.status == CheckStatus::Pass));
    assert_eq!(report.checks[3].details, "Found 4 drop rules in Input chain.");
    assert_eq!(device.commands().len(), 5);
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn test_factory_defaults_fail() {
    let device = FakeDevice::new()
        .reply("/user print", Reply::stdout("1"))
        .reply("/ip service print count-only where name=\"telnet\"", Reply::stdout("1"))
        .reply("/ip dns get", Reply::stdout("yes"))
        .reply("/ip firewall filter print", Reply::stdout("0"));
    let report = run_compliance_scan(&device, &target("192.168.88.1"), Duration::from_secs(5)).await;

    assert!(!report.passed);
    let statuses: Vec<CheckStatus> = report.checks.iter().map(|c| c.status).collect();
    assert_eq!(
        statuses,
        vec![
            CheckStatus::Fail,
            CheckStatus::Fail,
            CheckStatus::Warning,
            CheckStatus::Fail,
        ]
    );
    assert_eq!(report.checks[1].details, "Telnet ENABLED. Disable them immediately.");
}

#[tokio::test]
async fn test_unreachable_device() {
    let device = FakeDevice::unreachable();
    let report = run_compliance_scan(&device, &target("192.168.88.1"), Duration::from_secs(5)).await;

    assert!(!report.passed);
    assert!(report.checks.is_empty());
    assert_eq!(report.error.as_deref(), Some("Could not connect to device."));
}

#[tokio::test]
async fn test_session_lost_mid_scan() {
    let device = FakeDevice::new()
        .reply("/user print", Reply::stdout("0"))
        .reply("/ip dns get", Reply::Disconnect);
    let report = run_compliance_scan(&device, &target("192.168.88.1"), Duration::from_secs(5)).await;

    assert!(!report.passed);
    // checks completed before the failure are kept
    assert_eq!(report.checks.len(), 2);
    assert!(report
        .error
        .as_deref()
        .unwrap()
        .starts_with("Error during scan: "));
    assert_eq!(device.closes(), 1);
}
