//! Session backend driving the system OpenSSH client
//!
//! A session is an OpenSSH ControlMaster connection: `connect` authenticates
//! once and leaves a master process behind a per-session control socket,
//! `exec` and `upload` multiplex over it, and `close` tells the master to exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ExecOutput, RemoteSession, SessionConnector, SessionError, Target};
use crate::utils::short_id;

/// Exit status OpenSSH uses for its own (transport) failures
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// OpenSSH client options
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Value for `StrictHostKeyChecking`
    pub host_key_policy: String,

    /// Directory holding control sockets
    pub control_dir: PathBuf,

    /// Keepalive interval for the master connection
    pub keepalive_interval: Duration,

    /// Identity file used when the target's credentials name none
    pub default_identity_file: Option<PathBuf>,

    /// OpenSSH client binary
    pub ssh_program: PathBuf,

    /// Extra time granted to the ssh process on top of its own ConnectTimeout
    pub connect_grace: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            host_key_policy: "accept-new".to_string(),
            control_dir: std::env::temp_dir(),
            keepalive_interval: Duration::from_secs(5),
            default_identity_file: None,
            ssh_program: PathBuf::from("ssh"),
            connect_grace: Duration::from_secs(5),
        }
    }
}

/// Opens [`OpenSshSession`]s
#[derive(Debug, Clone, Default)]
pub struct OpenSshConnector {
    options: SshOptions,
}

impl OpenSshConnector {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionConnector for OpenSshConnector {
    type Session = OpenSshSession;

    async fn connect(&self, target: &Target, timeout: Duration) -> Result<OpenSshSession, SessionError> {
        let control_path = self
            .options
            .control_dir
            .join(format!("titan-{}.sock", short_id(8)));
        let log_path = control_path.with_extension("log");
        let password = target.credentials.password.clone();

        let mut cmd = base_command(&self.options.ssh_program, password.as_ref());
        cmd.args(["-M", "-N", "-f"])
            .arg("-E")
            .arg(&log_path)
            .arg("-o")
            .arg(format!("ControlPath={}", control_path.display()))
            .arg("-o")
            .arg(format!("StrictHostKeyChecking={}", self.options.host_key_policy))
            .arg("-o")
            .arg(format!("ConnectTimeout={}", timeout.as_secs().max(1)))
            .arg("-o")
            .arg(format!(
                "ServerAliveInterval={}",
                self.options.keepalive_interval.as_secs().max(1)
            ))
            .arg("-o")
            .arg("ServerAliveCountMax=2");

        if password.is_none() {
            cmd.arg("-o").arg("BatchMode=yes");
        }

        let identity = target
            .credentials
            .identity_file
            .as_ref()
            .or(self.options.default_identity_file.as_ref());
        if let Some(identity) = identity {
            cmd.arg("-i").arg(identity);
        }

        let host_spec = format!("{}@{}", target.credentials.username, target.host);
        cmd.arg("-p")
            .arg(target.port.to_string())
            .arg(&host_spec)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        debug!("Opening SSH master to {} ({})", target, control_path.display());

        let connect_error = |reason: String| SessionError::Connect {
            host: target.host.clone(),
            reason,
        };

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Err(connect_error(format!("failed to run ssh: {}", e))),
        };

        // `-f` backgrounds the master after authentication, so the foreground
        // process exits as soon as the session is usable.
        let grace = self.options.connect_grace;
        let waited = tokio::time::timeout(timeout + grace, child.wait()).await;
        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                discard_files(&log_path, &control_path).await;
                return Err(connect_error(format!("failed to wait for ssh: {}", e)));
            }
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    debug!("Unable to kill stalled ssh: {}", e);
                }
                let _ = child.wait().await;
                discard_files(&log_path, &control_path).await;
                return Err(connect_error(format!("timed out after {:?}", timeout)));
            }
        };

        if !status.success() {
            let reason = read_log_tail(&log_path)
                .await
                .unwrap_or_else(|| format!("ssh exited with {:?}", status.code()));
            discard_files(&log_path, &control_path).await;
            return Err(connect_error(reason));
        }

        Ok(OpenSshSession {
            program: self.options.ssh_program.clone(),
            host_spec,
            port: target.port,
            control_path,
            log_path,
            open: true,
        })
    }
}

/// A live ControlMaster connection
#[derive(Debug)]
pub struct OpenSshSession {
    program: PathBuf,
    host_spec: String,
    port: u16,
    control_path: PathBuf,
    log_path: PathBuf,
    open: bool,
}

impl OpenSshSession {
    fn control_option(&self) -> String {
        format!("ControlPath={}", self.control_path.display())
    }

    fn mux_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-o")
            .arg(self.control_option())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-p")
            .arg(self.port.to_string());
        cmd
    }
}

#[async_trait]
impl RemoteSession for OpenSshSession {
    async fn exec(&mut self, command: &str) -> Result<ExecOutput, SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }

        let output = self
            .mux_command()
            .arg(&self.host_spec)
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        match output.status.code() {
            Some(SSH_TRANSPORT_FAILURE) | None => Err(SessionError::Disconnected(
                if stderr.trim().is_empty() {
                    "connection closed".to_string()
                } else {
                    stderr.trim().to_string()
                },
            )),
            Some(_) => Ok(ExecOutput { stdout, stderr }),
        }
    }

    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> Result<(), SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }

        let output = Command::new("scp")
            .arg("-o")
            .arg(self.control_option())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-P")
            .arg(self.port.to_string())
            .arg(local_path)
            .arg(format!("{}:{}", self.host_spec, remote_path))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SessionError::Transfer(format!("failed to run scp: {}", e)))?;

        if !output.status.success() {
            return Err(SessionError::Transfer(format!(
                "scp failed with exit code {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let status = self
            .mux_command()
            .args(["-O", "exit"])
            .arg(&self.host_spec)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            // The master is already gone, typically because the device rebooted.
            debug!("SSH master for {} was not running", self.host_spec);
        }

        let _ = tokio::fs::remove_file(&self.log_path).await;
        let _ = tokio::fs::remove_file(&self.control_path).await;
        Ok(())
    }
}

impl Drop for OpenSshSession {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        warn!("SSH session to {} dropped without close, tearing down master", self.host_spec);
        let result = std::process::Command::new(&self.program)
            .arg("-o")
            .arg(self.control_option())
            .args(["-O", "exit"])
            .arg(&self.host_spec)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = result {
            warn!("Failed to tear down SSH master: {}", e);
        }
        let _ = std::fs::remove_file(&self.log_path);
    }
}

/// `ssh`/`scp` command, wrapped in `sshpass -e` when a password is supplied
fn base_command(program: &Path, password: Option<&SecretString>) -> Command {
    match password {
        Some(password) => {
            let mut cmd = Command::new("sshpass");
            cmd.arg("-e")
                .arg(program)
                .env("SSHPASS", password.expose_secret());
            cmd
        }
        None => Command::new(program),
    }
}

/// Remove what a failed master attempt may have left behind
async fn discard_files(log_path: &Path, control_path: &Path) {
    let _ = tokio::fs::remove_file(log_path).await;
    let _ = tokio::fs::remove_file(control_path).await;
}

/// Last non-empty line of the ssh log, which carries the failure reason
async fn read_log_tail(path: &Path) -> Option<String> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    contents
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
