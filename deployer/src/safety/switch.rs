//! Armed/disarmed state of a safety reboot schedule

use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;
use crate::utils::short_id;

/// Prefix of every safety reboot schedule name
pub const SAFETY_SCHEDULE_PREFIX: &str = "SAFE_MODE_ROLLBACK_";

/// Grace interval before the armed reboot fires
pub const SAFETY_GRACE_INTERVAL: &str = "4m";

/// Length of the random schedule-name discriminator
const DISCRIMINATOR_LEN: usize = 6;

/// Switch state. The only transition is `Armed` -> `Disarmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    Armed,
    Disarmed,
}

/// One safety reboot schedule on a device
#[derive(Debug, Clone)]
pub struct DeadMansSwitch {
    schedule_name: String,
    state: SwitchState,
}

impl DeadMansSwitch {
    /// Arm a new switch under a fresh, collision-free schedule name
    pub fn arm() -> Self {
        Self {
            schedule_name: format!("{}{}", SAFETY_SCHEDULE_PREFIX, short_id(DISCRIMINATOR_LEN)),
            state: SwitchState::Armed,
        }
    }

    pub fn schedule_name(&self) -> &str {
        &self.schedule_name
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    /// Command registering the reboot schedule
    pub fn arm_command(&self) -> String {
        format!(
            "/system scheduler add name=\"{}\" interval={} on-event=\"/system reboot\" start-time=startup",
            self.schedule_name, SAFETY_GRACE_INTERVAL
        )
    }

    /// Transition to `Disarmed` and return the command removing the schedule
    pub fn disarm(&mut self) -> Result<String, DeployerError> {
        match self.state {
            SwitchState::Armed => {
                self.state = SwitchState::Disarmed;
                Ok(format!(
                    "/system scheduler remove [find name=\"{}\"]",
                    self.schedule_name
                ))
            }
            SwitchState::Disarmed => Err(DeployerError::TransitionError(format!(
                "safety switch {} is already disarmed",
                self.schedule_name
            ))),
        }
    }
}
