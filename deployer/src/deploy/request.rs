//! Deployment request and outcome models

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::deploy::fsm::DeploymentPhase;
use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::safety::SafetyScript;
use crate::session::Target;
use crate::status::StatusEvent;
use crate::utils::short_id;

/// The rendered script to deploy
#[derive(Debug, Clone)]
pub enum ScriptPayload {
    /// A script already on local disk
    File(PathBuf),

    /// Script contents held in memory, staged to disk before upload
    Inline(Vec<u8>),
}

impl From<SafetyScript> for ScriptPayload {
    fn from(script: SafetyScript) -> Self {
        ScriptPayload::Inline(script.text.into_bytes())
    }
}

/// Everything needed for one deployment
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    /// Device as reachable right now
    pub target: Target,

    /// Script to upload and import
    pub payload: ScriptPayload,

    /// Address the device answers on once the script has run
    pub post_change_host: String,

    /// The script triggers a large asynchronous download
    pub heavy_payload: bool,
}

impl DeploymentRequest {
    pub fn new(target: Target, payload: ScriptPayload, post_change_host: impl Into<String>) -> Self {
        Self {
            target,
            payload,
            post_change_host: post_change_host.into(),
            heavy_payload: false,
        }
    }

    pub fn with_heavy_payload(mut self, heavy_payload: bool) -> Self {
        self.heavy_payload = heavy_payload;
        self
    }
}

/// Result of a deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub success: bool,

    /// Phase the attempt ended in
    pub phase: DeploymentPhase,

    /// Whether the device answered at its post-change address, `None` if the
    /// wait never started
    pub reachable: Option<bool>,

    /// Fatal error, verbatim
    pub error: Option<String>,

    /// Every status event emitted, in order
    pub trace: Vec<StatusEvent>,
}

impl DeploymentOutcome {
    /// Status messages without metadata
    pub fn messages(&self) -> Vec<&str> {
        self.trace.iter().map(|e| e.message.as_str()).collect()
    }
}

/// Payload materialised on local disk for the upload
#[derive(Debug)]
pub(crate) struct StagedScript {
    file: File,
    owned: bool,
}

impl StagedScript {
    pub(crate) async fn prepare(payload: &ScriptPayload, staging_dir: &Path) -> Result<Self, DeployerError> {
        match payload {
            ScriptPayload::File(path) => Ok(Self {
                file: File::new(path.clone()),
                owned: false,
            }),
            ScriptPayload::Inline(bytes) => {
                let file = File::new(staging_dir.join(format!("setup-{}.rsc", short_id(8))));
                file.write_bytes(bytes).await?;
                Ok(Self { file, owned: true })
            }
        }
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    pub(crate) async fn cleanup(self) {
        if !self.owned {
            return;
        }
        if let Err(e) = self.file.delete().await {
            warn!("Failed to remove staged script {}: {}", self.file.path().display(), e);
        }
    }
}
