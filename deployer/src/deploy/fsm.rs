//! Finite State Machine for a single deployment attempt

use serde::{Deserialize, Serialize};

/// Step a deployment attempt has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    /// Not started
    Pending,

    /// Opening the session
    Connecting,

    /// Looking for flash storage
    DetectingStorage,

    /// Copying the script to the device
    Uploading,

    /// Registering the one-shot import schedule
    Scheduling,

    /// Script scheduled, session being closed
    Disconnecting,

    /// Session closed, waiting for the device at its new address
    AwaitingDevice,

    /// Sequence completed
    Succeeded,

    /// A fatal error aborted the sequence
    Failed,
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Begin the attempt
    Start,

    /// Session established
    Connected,

    /// Storage prefix resolved
    StorageDetected,

    /// Script uploaded
    Uploaded,

    /// Import schedule accepted by the device
    Scheduled,

    /// Session closed on purpose
    Disconnected,

    /// Reachability wait finished, whatever its result
    Finished,

    /// Fatal error
    Fail(String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    phase: DeploymentPhase,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            phase: DeploymentPhase::Pending,
            error: None,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> DeploymentPhase {
        self.phase
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True once the attempt can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, DeploymentPhase::Succeeded | DeploymentPhase::Failed)
    }

    /// Process an event and transition phase
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        use DeploymentPhase::*;

        let new_phase = match (&self.phase, &event) {
            (Pending, DeploymentEvent::Start) => Connecting,
            (Connecting, DeploymentEvent::Connected) => DetectingStorage,
            (DetectingStorage, DeploymentEvent::StorageDetected) => Uploading,
            (Uploading, DeploymentEvent::Uploaded) => Scheduling,
            (Scheduling, DeploymentEvent::Scheduled) => Disconnecting,
            (Disconnecting, DeploymentEvent::Disconnected) => AwaitingDevice,
            (AwaitingDevice, DeploymentEvent::Finished) => Succeeded,

            // Only the steps before the script is scheduled can fail the attempt
            (Pending | Connecting | DetectingStorage | Uploading | Scheduling, DeploymentEvent::Fail(err)) => {
                self.error = Some(err.clone());
                Failed
            }

            // Invalid transitions
            (phase, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", phase, event));
            }
        };

        self.phase = new_phase;
        Ok(())
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
