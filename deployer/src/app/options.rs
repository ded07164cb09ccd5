//! Application configuration options

use std::time::Duration;

use crate::deploy::orchestrator::DeployOptions;
use crate::deploy::reset::ResetOptions;
use crate::deploy::schedule::TimingPolicy;
use crate::probe::ProbeOptions;
use crate::session::openssh::SshOptions;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::traffic;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// SSH port used when a target names none
    pub ssh_port: u16,

    /// OpenSSH client options
    pub ssh: SshOptions,

    /// Deployment options
    pub deploy: DeployOptions,

    /// Reachability probe options
    pub probe: ProbeOptions,

    /// Factory reset options
    pub reset: ResetOptions,

    /// Traffic worker options
    pub traffic: traffic::Options,
}

impl AppOptions {
    /// Build options from the settings file
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        let connect_timeout = Duration::from_secs(settings.ssh.connect_timeout_secs);
        let staging_dir = settings
            .staging_dir
            .clone()
            .unwrap_or_else(|| layout.staging_dir().path().to_path_buf());

        Self {
            ssh_port: settings.ssh.port,
            ssh: SshOptions {
                host_key_policy: settings.ssh.host_key_policy.clone(),
                default_identity_file: settings.ssh.identity_file.clone(),
                ..Default::default()
            },
            deploy: DeployOptions {
                connect_timeout,
                timing: TimingPolicy {
                    normal_start_offset: Duration::from_secs(settings.timing.start_offset_secs),
                    heavy_start_offset: Duration::from_secs(settings.timing.heavy_start_offset_secs),
                    normal_probe_timeout: Duration::from_secs(settings.timing.probe_timeout_secs),
                    heavy_probe_timeout: Duration::from_secs(settings.timing.heavy_probe_timeout_secs),
                },
                staging_dir,
            },
            probe: ProbeOptions {
                port: settings.probe.port,
                attempt_timeout: Duration::from_secs(settings.probe.attempt_timeout_secs),
                retry_delay: Duration::from_secs(settings.probe.retry_delay_secs),
            },
            reset: ResetOptions {
                connect_timeout,
                settle_delay: Duration::from_secs(settings.reset.settle_delay_secs),
            },
            traffic: traffic::Options::default(),
            layout,
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(StorageLayout::default(), &Settings::default())
    }
}
