//! Traffic worker tests

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;

use titan_deployer::workers::traffic::{self, TrafficMonitor};

use crate::common::{target, FakeDevice, Reply};

fn options() -> traffic::Options {
    traffic::Options {
        interval: Duration::from_millis(20),
        connect_timeout: Duration::from_secs(1),
    }
}

#[tokio::test]
async fn test_worker_samples_selected_interface() {
    let device = FakeDevice::new().reply(
        "/interface monitor-traffic",
        Reply::stdout("rx-bits-per-second: 2.5Mbps\ntx-bits-per-second: 120kbps\n"),
    );
    let monitor = Arc::new(TrafficMonitor::new("ether1"));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let worker = {
        let device = device.clone();
        let monitor = monitor.clone();
        tokio::spawn(async move {
            traffic::run(
                &options(),
                monitor,
                &device,
                &target("192.168.88.1"),
                tokio::time::sleep,
                stop_rx.map(|_| ()).boxed(),
            )
            .await;
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.set_interface("sfp-sfpplus1").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();
    worker.await.unwrap();

    let stats = monitor.stats().await;
    assert_eq!(stats.rx, 2_500_000.0);
    assert_eq!(stats.tx, 120_000.0);

    let commands = device.commands();
    assert!(commands.contains(&"/interface monitor-traffic interface=ether1 once".to_string()));
    assert_eq!(
        commands.last().unwrap(),
        "/interface monitor-traffic interface=sfp-sfpplus1 once"
    );
    // one persistent session, closed on shutdown
    assert_eq!(device.connects(), 1);
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn test_worker_reconnects_after_session_error() {
    let device = FakeDevice::new().reply("/interface monitor-traffic", Reply::Disconnect);
    let monitor = Arc::new(TrafficMonitor::default());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let worker = {
        let device = device.clone();
        let monitor = monitor.clone();
        tokio::spawn(async move {
            traffic::run(
                &options(),
                monitor,
                &device,
                &target("192.168.88.1"),
                tokio::time::sleep,
                stop_rx.map(|_| ()).boxed(),
            )
            .await;
        })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    stop_tx.send(()).unwrap();
    worker.await.unwrap();

    assert!(device.connects() >= 2);
    assert_eq!(device.connects(), device.closes());
    assert_eq!(monitor.stats().await, Default::default());
}
