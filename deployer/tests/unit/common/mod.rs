//! Scripted stand-ins for a device session and the reachability probe

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use titan_deployer::probe::{ProbeOutcome, Reachability};
use titan_deployer::session::{
    Credentials, ExecOutput, RemoteSession, SessionConnector, SessionError, Target,
};
use titan_deployer::status::Recorder;

/// How the fake device answers a command
#[derive(Debug, Clone)]
pub enum Reply {
    Output { stdout: String, stderr: String },
    /// Remote end drops the channel
    Disconnect,
    /// Low-level I/O failure
    Io,
    /// Any other session failure
    Closed,
}

impl Reply {
    pub fn stdout(text: &str) -> Self {
        Reply::Output {
            stdout: text.to_string(),
            stderr: String::new(),
        }
    }

    pub fn stderr(text: &str) -> Self {
        Reply::Output {
            stdout: String::new(),
            stderr: text.to_string(),
        }
    }

    fn into_result(self) -> Result<ExecOutput, SessionError> {
        match self {
            Reply::Output { stdout, stderr } => Ok(ExecOutput::new(stdout, stderr)),
            Reply::Disconnect => Err(SessionError::Disconnected("connection reset by peer".to_string())),
            Reply::Io => Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "unexpected eof",
            ))),
            Reply::Closed => Err(SessionError::Closed),
        }
    }
}

/// A recorded upload, with the file contents as they were at upload time
#[derive(Debug, Clone)]
pub struct Upload {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct DeviceState {
    pub refuse_connections: bool,
    pub fail_uploads: bool,
    /// Replies keyed by command prefix; unmatched commands print nothing
    pub replies: Vec<(String, Reply)>,

    pub connects: usize,
    pub closes: usize,
    pub commands: Vec<String>,
    pub uploads: Vec<Upload>,
}

/// Connector handing out sessions to one scripted device
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    pub state: Arc<Mutex<DeviceState>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        let device = Self::new();
        device.state.lock().unwrap().refuse_connections = true;
        device
    }

    pub fn reply(self, prefix: &str, reply: Reply) -> Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .push((prefix.to_string(), reply));
        self
    }

    pub fn failing_uploads(self) -> Self {
        self.state.lock().unwrap().fail_uploads = true;
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl SessionConnector for FakeDevice {
    type Session = FakeSession;

    async fn connect(&self, target: &Target, _timeout: Duration) -> Result<FakeSession, SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connections {
            return Err(SessionError::Connect {
                host: target.host.clone(),
                reason: "connection refused".to_string(),
            });
        }
        state.connects += 1;
        Ok(FakeSession {
            state: self.state.clone(),
        })
    }
}

pub struct FakeSession {
    state: Arc<Mutex<DeviceState>>,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn exec(&mut self, command: &str) -> Result<ExecOutput, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command.to_string());
        let reply = state
            .replies
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Reply::stdout(""));
        reply.into_result()
    }

    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_uploads {
            return Err(SessionError::Transfer("scp: permission denied".to_string()));
        }
        let contents = std::fs::read(local_path)?;
        state.uploads.push(Upload {
            local_path: local_path.to_path_buf(),
            remote_path: remote_path.to_string(),
            contents,
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Probe answering immediately and remembering what it was asked
#[derive(Debug, Clone)]
pub struct FakeProbe {
    pub reachable: bool,
    pub calls: Arc<Mutex<Vec<(String, Duration)>>>,
}

impl FakeProbe {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            calls: Arc::default(),
        }
    }

    pub fn never_reachable() -> Self {
        Self {
            reachable: false,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reachability for FakeProbe {
    async fn wait_until_reachable(&self, host: &str, timeout: Duration, status: &mut Recorder) -> ProbeOutcome {
        self.calls.lock().unwrap().push((host.to_string(), timeout));
        if self.reachable {
            status.info(format!("Target {} is online!", host));
            ProbeOutcome::Reachable {
                attempts: 1,
                elapsed: Duration::ZERO,
            }
        } else {
            status.warn(format!("Warning: Timed out waiting for {}", host));
            ProbeOutcome::TimedOut {
                attempts: 3,
                elapsed: timeout,
            }
        }
    }
}

pub fn target(host: &str) -> Target {
    Target::new(host, Credentials::new("admin").with_password("secret"))
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("titan-test-{}", titan_deployer::utils::short_id(10)))
}
