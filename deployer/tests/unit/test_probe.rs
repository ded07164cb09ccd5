//! Reachability probe tests against loopback listeners

use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::watch;

use titan_deployer::probe::{ProbeOptions, ProbeOutcome, Reachability, TcpProbe};
use titan_deployer::status::{Recorder, StatusLevel, StatusSink};

fn fast_probe(port: u16) -> TcpProbe {
    TcpProbe::new(ProbeOptions {
        port,
        attempt_timeout: Duration::from_millis(200),
        retry_delay: Duration::from_millis(100),
    })
}

/// A port nothing listens on
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_listening_port_is_reachable_on_first_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut recorder = Recorder::new(StatusSink::disabled());
    let outcome = fast_probe(port)
        .wait_until_reachable("127.0.0.1", Duration::from_secs(2), &mut recorder)
        .await;

    assert!(outcome.is_reachable());
    assert_eq!(outcome.attempts(), 1);
    let trace = recorder.into_trace();
    assert_eq!(trace.last().unwrap().message, "Target 127.0.0.1 is online!");
}

#[tokio::test]
async fn test_timeout_bounds_total_wait() {
    let port = closed_port().await;
    let timeout = Duration::from_secs(1);

    let mut recorder = Recorder::new(StatusSink::disabled());
    let start = Instant::now();
    let outcome = fast_probe(port)
        .wait_until_reachable("127.0.0.1", timeout, &mut recorder)
        .await;
    let elapsed = start.elapsed();

    assert!(matches!(outcome, ProbeOutcome::TimedOut { .. }), "{:?}", outcome);
    assert!(outcome.attempts() >= 2);
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_millis(500), "{:?}", elapsed);

    // every attempt is reported, then one warning
    let trace = recorder.into_trace();
    let attempts = trace
        .iter()
        .filter(|e| e.message.starts_with("Attempt "))
        .count();
    assert_eq!(attempts as u32, outcome.attempts());
    let last = trace.last().unwrap();
    assert_eq!(last.level, StatusLevel::Warn);
    assert_eq!(last.message, "Warning: Timed out waiting for 127.0.0.1");
}

#[tokio::test]
async fn test_device_coming_back_is_detected() {
    let port = closed_port().await;

    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let _ = listener.accept().await;
    });

    let mut recorder = Recorder::new(StatusSink::disabled());
    let outcome = fast_probe(port)
        .wait_until_reachable("127.0.0.1", Duration::from_secs(5), &mut recorder)
        .await;

    assert!(outcome.is_reachable(), "{:?}", outcome);
    assert!(outcome.attempts() >= 2);
    server.abort();
}

#[tokio::test]
async fn test_cancellation_ends_the_wait() {
    let port = closed_port().await;
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = cancel_tx.send(true);
    });

    let mut recorder = Recorder::new(StatusSink::disabled());
    let start = Instant::now();
    let outcome = fast_probe(port)
        .with_cancellation(cancel_rx)
        .wait_until_reachable("127.0.0.1", Duration::from_secs(30), &mut recorder)
        .await;

    assert!(matches!(outcome, ProbeOutcome::Cancelled { .. }), "{:?}", outcome);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(
        recorder.into_trace().last().unwrap().message,
        "Stopped waiting for 127.0.0.1"
    );
}

#[test]
fn test_default_options() {
    let options = ProbeOptions::default();
    assert_eq!(options.port, 22);
    assert_eq!(options.attempt_timeout, Duration::from_secs(2));
    assert_eq!(options.retry_delay, Duration::from_secs(2));
}
