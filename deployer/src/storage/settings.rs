//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::session::DEFAULT_SSH_PORT;

/// Deployer settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// Also write logs under the storage layout
    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default)]
    pub ssh: SshSettings,

    #[serde(default)]
    pub probe: ProbeSettings,

    #[serde(default)]
    pub timing: TimingSettings,

    #[serde(default)]
    pub reset: ResetSettings,

    /// Overrides the layout's staging directory
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

impl Settings {
    /// Load `file`, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, DeployerError> {
        if !file.exists().await {
            debug!("No settings at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        let settings = file.read_json().await.map_err(|e| {
            DeployerError::ConfigError(format!("{}: {}", file.path().display(), e))
        })?;
        info!("Loaded settings from {}", file.path().display());
        Ok(settings)
    }
}

/// SSH session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshSettings {
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Identity file used when no password is given
    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    /// Value for `StrictHostKeyChecking`
    #[serde(default = "default_host_key_policy")]
    pub host_key_policy: String,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_host_key_policy() -> String {
    "accept-new".to_string()
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            connect_timeout_secs: default_connect_timeout(),
            identity_file: None,
            host_key_policy: default_host_key_policy(),
        }
    }
}

/// Reachability probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    #[serde(default = "default_two")]
    pub attempt_timeout_secs: u64,

    #[serde(default = "default_two")]
    pub retry_delay_secs: u64,
}

fn default_two() -> u64 {
    2
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            attempt_timeout_secs: 2,
            retry_delay_secs: 2,
        }
    }
}

/// Scheduling offsets and post-change wait budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    #[serde(default = "default_two")]
    pub start_offset_secs: u64,

    #[serde(default = "default_heavy_offset")]
    pub heavy_start_offset_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_heavy_probe_timeout")]
    pub heavy_probe_timeout_secs: u64,
}

fn default_heavy_offset() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    120
}

fn default_heavy_probe_timeout() -> u64 {
    300
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            start_offset_secs: 2,
            heavy_start_offset_secs: default_heavy_offset(),
            probe_timeout_secs: default_probe_timeout(),
            heavy_probe_timeout_secs: default_heavy_probe_timeout(),
        }
    }
}

/// Factory reset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetSettings {
    #[serde(default = "default_two")]
    pub settle_delay_secs: u64,
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self { settle_delay_secs: 2 }
    }
}
