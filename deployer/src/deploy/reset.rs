//! Factory reset
//!
//! The reset command makes the device drop the session while the command is
//! still running. A session that ends, hits end-of-stream or fails with an I/O
//! error after the command was submitted is therefore the normal result, and
//! is reported as success. Only a connection that cannot be opened, or a
//! different kind of error, is a failure.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::errors::DeployerError;
use crate::session::{RemoteSession, SessionConnector, Target};
use crate::status::{Recorder, StatusEvent, StatusSink};

/// Wipes the configuration without restoring defaults or keeping a backup
pub const RESET_COMMAND: &str = "/system reset-configuration no-defaults=yes skip-backup=yes";

/// Reset settings
#[derive(Debug, Clone)]
pub struct ResetOptions {
    pub connect_timeout: Duration,

    /// Time given to the device to act on the command before the session is
    /// closed
    pub settle_delay: Duration,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Result of a reset
#[derive(Debug, Clone, Serialize)]
pub struct ResetOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub trace: Vec<StatusEvent>,
}

/// Issues factory resets
pub struct Resetter<C> {
    connector: C,
    options: ResetOptions,
}

impl<C: SessionConnector> Resetter<C> {
    pub fn new(connector: C, options: ResetOptions) -> Self {
        Self { connector, options }
    }

    /// Reset `target` to an empty configuration
    pub async fn factory_reset(&self, target: &Target, status: StatusSink) -> ResetOutcome {
        let mut recorder = Recorder::new(status);

        match self.run(target, &mut recorder).await {
            Ok(()) => {
                recorder.info("Reset command sent. Router is rebooting.");
                ResetOutcome {
                    success: true,
                    error: None,
                    trace: recorder.into_trace(),
                }
            }
            Err(e) => {
                let message = e.to_string();
                recorder.error(format!("Reset Failed: {}", message));
                ResetOutcome {
                    success: false,
                    error: Some(message),
                    trace: recorder.into_trace(),
                }
            }
        }
    }

    async fn run(&self, target: &Target, status: &mut Recorder) -> Result<(), DeployerError> {
        status.info(format!("Connecting to {} for Reset...", target));
        let mut session = self
            .connector
            .connect(target, self.options.connect_timeout)
            .await
            .map_err(|e| DeployerError::ConnectionError(e.to_string()))?;

        status.info("Sending Reset Command (Nuke & Pave)...");
        let result = match session.exec(RESET_COMMAND).await {
            Ok(output) => {
                if let Some(text) = output.error_text() {
                    debug!("Reset command printed: {}", text);
                }
                tokio::time::sleep(self.options.settle_delay).await;
                Ok(())
            }
            Err(e) if e.is_expected_disconnect() => {
                debug!("Session ended after reset command: {}", e);
                Ok(())
            }
            Err(e) => Err(DeployerError::from_session(e)),
        };

        // the device is usually gone by now
        if let Err(e) = session.close().await {
            debug!("Ignoring close error after reset: {}", e);
        }

        result
    }
}
