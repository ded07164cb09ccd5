//! One-shot import schedule and deployment timing

use std::time::Duration;

use crate::utils::routeros_time;

/// Fixed name of the deployment schedule. At most one deployment per device
/// may be in flight: a second deployment removes the first one's schedule.
pub const DEPLOY_SCHEDULE_NAME: &str = "TITAN_DEPLOY";

/// File name the script is uploaded as
pub const REMOTE_SCRIPT_NAME: &str = "setup.rsc";

/// Start offsets and reachability budgets, normal vs heavy payload.
///
/// Heavy payloads (bundled container or package downloads) start later so
/// the session is long gone before the download begins, and get a longer
/// budget to come back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingPolicy {
    pub normal_start_offset: Duration,
    pub heavy_start_offset: Duration,
    pub normal_probe_timeout: Duration,
    pub heavy_probe_timeout: Duration,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            normal_start_offset: Duration::from_secs(2),
            heavy_start_offset: Duration::from_secs(60),
            normal_probe_timeout: Duration::from_secs(120),
            heavy_probe_timeout: Duration::from_secs(300),
        }
    }
}

impl TimingPolicy {
    pub fn start_offset(&self, heavy_payload: bool) -> Duration {
        if heavy_payload {
            self.heavy_start_offset
        } else {
            self.normal_start_offset
        }
    }

    pub fn probe_timeout(&self, heavy_payload: bool) -> Duration {
        if heavy_payload {
            self.heavy_probe_timeout
        } else {
            self.normal_probe_timeout
        }
    }
}

/// Remove every schedule called `name`. A no-op when none exists.
pub fn remove_schedule_command(name: &str) -> String {
    format!("/system scheduler remove [find name={}]", name)
}

/// Run `/import` on `remote_path` once, `offset` after the device's current time
pub fn add_schedule_command(name: &str, remote_path: &str, offset: Duration) -> String {
    format!(
        "/system scheduler add name={} on-event=\"/import file={} verbose=yes\" start-time=([/system clock get time] + {}) interval=0",
        name,
        remote_path,
        routeros_time(offset)
    )
}
