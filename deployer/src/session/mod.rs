//! Remote session seam
//!
//! The orchestrators only talk to a device through [`SessionConnector`] and
//! [`RemoteSession`]. The OpenSSH-backed implementation lives in [`openssh`];
//! tests plug in scripted fakes.

pub mod openssh;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

/// Default SSH management port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Errors raised by a session transport
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session could not be established at all
    #[error("unable to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// The remote end closed the channel mid-command (EOF, reset, killed session)
    #[error("session ended by remote: {0}")]
    Disconnected(String),

    /// Low-level I/O failure on the channel
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File transfer failed
    #[error("{0}")]
    Transfer(String),

    /// The session was already closed
    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// True for the failures a command that reboots or wipes the device is
    /// expected to produce.
    pub fn is_expected_disconnect(&self) -> bool {
        matches!(self, SessionError::Disconnected(_) | SessionError::Io(_))
    }
}

/// Login credentials for a device
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,

    /// Password, never logged
    pub password: Option<SecretString>,

    /// Private key used instead of (or in addition to) a password
    pub identity_file: Option<PathBuf>,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            identity_file: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }
}

/// A device reachable over SSH
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl Target {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            credentials,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_SSH_PORT {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Captured output of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Stderr with surrounding whitespace removed, `None` when empty
    pub fn error_text(&self) -> Option<&str> {
        let text = self.stderr.trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// An authenticated command and file-transfer channel to one device.
///
/// A session belongs to exactly one deployment attempt. Callers must call
/// [`RemoteSession::close`] on every exit path.
#[async_trait]
pub trait RemoteSession: Send {
    /// Run a command and collect its output
    async fn exec(&mut self, command: &str) -> Result<ExecOutput, SessionError>;

    /// Copy a local file to `remote_path` on the device
    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> Result<(), SessionError>;

    /// Release the session. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Factory for [`RemoteSession`]s
#[async_trait]
pub trait SessionConnector: Send + Sync {
    type Session: RemoteSession;

    async fn connect(&self, target: &Target, timeout: Duration) -> Result<Self::Session, SessionError>;
}
