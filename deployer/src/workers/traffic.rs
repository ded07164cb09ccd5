//! Traffic monitor worker
//!
//! Keeps one session open to a device and samples the throughput of a single
//! interface on every tick. The sampled interface can be switched while the
//! worker runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::errors::DeployerError;
use crate::session::{RemoteSession, SessionConnector, Target};
use crate::telemetry::{monitor_traffic_command, parse_monitor_output, TrafficStats};

/// Traffic worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Sampling interval
    pub interval: Duration,

    /// Timeout for (re)opening the session
    pub connect_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// State shared between the worker and its readers
#[derive(Debug)]
pub struct TrafficMonitor {
    interface: RwLock<String>,
    stats: RwLock<TrafficStats>,
}

impl TrafficMonitor {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: RwLock::new(interface.into()),
            stats: RwLock::new(TrafficStats::default()),
        }
    }

    pub async fn set_interface(&self, interface: impl Into<String>) {
        *self.interface.write().await = interface.into();
    }

    pub async fn interface(&self) -> String {
        self.interface.read().await.clone()
    }

    /// Latest sample
    pub async fn stats(&self) -> TrafficStats {
        *self.stats.read().await
    }
}

impl Default for TrafficMonitor {
    fn default() -> Self {
        Self::new("ether1")
    }
}

/// Run the traffic worker until `shutdown_signal` resolves
pub async fn run<C, S, F>(
    options: &Options,
    monitor: Arc<TrafficMonitor>,
    connector: &C,
    target: &Target,
    sleep_fn: S,
    mut shutdown_signal: BoxFuture<'static, ()>,
) where
    C: SessionConnector,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Traffic worker starting for {}...", target);

    let mut session: Option<C::Session> = None;

    loop {
        if session.is_none() {
            match connector.connect(target, options.connect_timeout).await {
                Ok(s) => {
                    debug!("Traffic session to {} opened", target);
                    session = Some(s);
                }
                Err(e) => error!("Traffic connection to {} failed: {}", target, e),
            }
        }

        if let Some(active) = session.as_mut() {
            if let Err(e) = sample(active, &monitor).await {
                warn!("Traffic sample failed, reconnecting: {}", e);
                if let Err(e) = active.close().await {
                    debug!("Ignoring close error: {}", e);
                }
                session = None;
            }
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Traffic worker shutting down...");
                break;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }

    if let Some(mut active) = session {
        if let Err(e) = active.close().await {
            debug!("Ignoring close error: {}", e);
        }
    }
}

async fn sample<S: RemoteSession + ?Sized>(
    session: &mut S,
    monitor: &TrafficMonitor,
) -> Result<(), DeployerError> {
    let interface = monitor.interface().await;
    let output = session
        .exec(&monitor_traffic_command(&interface))
        .await
        .map_err(DeployerError::from_session)?;
    let stats = parse_monitor_output(&output.stdout)?;
    *monitor.stats.write().await = stats;
    Ok(())
}
