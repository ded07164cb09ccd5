//! Post-change reachability probing using pure async TCP connects.
//!
//! After a deployment the device may come back on a different address and
//! may take minutes to do so. The probe keeps trying the SSH management port
//! until it answers or the time budget runs out. A failed attempt is never an
//! error; only the final timeout is reported, as a warning.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::debug;

use crate::session::DEFAULT_SSH_PORT;
use crate::status::Recorder;

/// Probe timing
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Port that must accept a connection
    pub port: u16,

    /// Per-attempt connect timeout
    pub attempt_timeout: Duration,

    /// Pause between attempts
    pub retry_delay: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            attempt_timeout: Duration::from_secs(2),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The port accepted a connection
    Reachable { attempts: u32, elapsed: Duration },

    /// The time budget ran out
    TimedOut { attempts: u32, elapsed: Duration },

    /// The caller cancelled the wait
    Cancelled { attempts: u32, elapsed: Duration },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ProbeOutcome::Reachable { attempts, .. }
            | ProbeOutcome::TimedOut { attempts, .. }
            | ProbeOutcome::Cancelled { attempts, .. } => *attempts,
        }
    }
}

/// Something that can wait for a device to come back
#[async_trait]
pub trait Reachability: Send + Sync {
    /// Wait until `host` is reachable or `timeout` has elapsed.
    ///
    /// Every attempt is reported through `status`.
    async fn wait_until_reachable(
        &self,
        host: &str,
        timeout: Duration,
        status: &mut Recorder,
    ) -> ProbeOutcome;
}

/// TCP connect probe
#[derive(Debug, Clone, Default)]
pub struct TcpProbe {
    options: ProbeOptions,
    cancel: Option<watch::Receiver<bool>>,
}

impl TcpProbe {
    pub fn new(options: ProbeOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Stop waiting as soon as `cancel` turns `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Sleep for `delay`; returns `true` if cancelled meanwhile
    async fn pause(&self, delay: Duration) -> bool {
        match &self.cancel {
            Some(rx) => {
                let mut rx = rx.clone();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => false,
                    Ok(_) = rx.wait_for(|cancelled| *cancelled) => true,
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                false
            }
        }
    }
}

#[async_trait]
impl Reachability for TcpProbe {
    async fn wait_until_reachable(
        &self,
        host: &str,
        timeout: Duration,
        status: &mut Recorder,
    ) -> ProbeOutcome {
        let port = self.options.port;
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            if self.is_cancelled() {
                status.warn(format!("Stopped waiting for {}", host));
                return ProbeOutcome::Cancelled {
                    attempts,
                    elapsed: start.elapsed(),
                };
            }

            attempts += 1;
            match probe_once(host, port, self.options.attempt_timeout.min(remaining)).await {
                Ok(()) => {
                    status.info(format!("Target {} is online!", host));
                    return ProbeOutcome::Reachable {
                        attempts,
                        elapsed: start.elapsed(),
                    };
                }
                Err(reason) => {
                    status.info(format!(
                        "Attempt {}: {}:{} not reachable ({})",
                        attempts, host, port, reason
                    ));
                }
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            if self.pause(self.options.retry_delay.min(remaining)).await {
                status.warn(format!("Stopped waiting for {}", host));
                return ProbeOutcome::Cancelled {
                    attempts,
                    elapsed: start.elapsed(),
                };
            }
        }

        status.warn(format!("Warning: Timed out waiting for {}", host));
        ProbeOutcome::TimedOut {
            attempts,
            elapsed: start.elapsed(),
        }
    }
}

/// One connect attempt; the error is a human-readable reason
async fn probe_once(host: &str, port: u16, timeout: Duration) -> Result<(), String> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => {
            debug!("{}:{} accepted a connection", host, port);
            Ok(())
        }
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no answer within {:?}", timeout)),
    }
}
