//! Deployment orchestrator
//!
//! Uploads a script and hands its execution to the device's own scheduler,
//! so that the commands that may cut the session off run after the session
//! has already been closed on purpose. The orchestrator then waits for the
//! device at its post-change address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm};
use crate::deploy::request::{DeploymentOutcome, DeploymentRequest, StagedScript};
use crate::deploy::schedule::{
    add_schedule_command, remove_schedule_command, TimingPolicy, DEPLOY_SCHEDULE_NAME,
    REMOTE_SCRIPT_NAME,
};
use crate::deploy::storage::detect_storage_prefix;
use crate::errors::DeployerError;
use crate::probe::{ProbeOptions, Reachability, TcpProbe};
use crate::session::{RemoteSession, SessionConnector};
use crate::status::{Recorder, StatusSink};
use crate::utils::routeros_time;

/// Deployment settings
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Timeout for opening the session
    pub connect_timeout: Duration,

    /// Offsets and reachability budgets
    pub timing: TimingPolicy,

    /// Where in-memory payloads are written before upload
    pub staging_dir: PathBuf,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timing: TimingPolicy::default(),
            staging_dir: std::env::temp_dir(),
        }
    }
}

/// Runs deployments. Holds no per-deployment state, so one instance can serve
/// many devices; deployments to the *same* device must not overlap.
pub struct Deployer<C, P = TcpProbe> {
    connector: C,
    probe: P,
    options: DeployOptions,
}

impl<C: SessionConnector> Deployer<C, TcpProbe> {
    /// Deployer waiting on the device with a TCP probe
    pub fn new(connector: C, options: DeployOptions, probe: ProbeOptions) -> Self {
        Self::with_probe(connector, TcpProbe::new(probe), options)
    }
}

impl<C, P> Deployer<C, P>
where
    C: SessionConnector,
    P: Reachability,
{
    pub fn with_probe(connector: C, probe: P, options: DeployOptions) -> Self {
        Self {
            connector,
            probe,
            options,
        }
    }

    /// Deploy `request`, reporting progress through `status`.
    ///
    /// Connecting, uploading and scheduling are all-or-nothing: the first
    /// fatal error aborts, closes the session and fails the outcome. A device
    /// that does not come back within the budget only produces a warning.
    pub async fn deploy(&self, request: DeploymentRequest, status: StatusSink) -> DeploymentOutcome {
        let mut recorder = Recorder::new(status);
        let mut fsm = DeploymentFsm::new();

        let result = self.run(&request, &mut fsm, &mut recorder).await;

        match result {
            Ok(reachable) => {
                recorder.info("Deployment Successful!");
                DeploymentOutcome {
                    success: true,
                    phase: fsm.phase(),
                    reachable: Some(reachable),
                    error: None,
                    trace: recorder.into_trace(),
                }
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(err) = fsm.process(DeploymentEvent::Fail(message.clone())) {
                    debug!("{}", err);
                }
                recorder.error(format!("Deployment Failed: {}", message));
                DeploymentOutcome {
                    success: false,
                    phase: fsm.phase(),
                    reachable: None,
                    error: Some(message),
                    trace: recorder.into_trace(),
                }
            }
        }
    }

    /// Full sequence; returns whether the device answered afterwards
    async fn run(
        &self,
        request: &DeploymentRequest,
        fsm: &mut DeploymentFsm,
        status: &mut Recorder,
    ) -> Result<bool, DeployerError> {
        let staged = StagedScript::prepare(&request.payload, &self.options.staging_dir).await?;
        let applied = self.apply(request, staged.path(), fsm, status).await;
        staged.cleanup().await;
        applied?;

        advance(fsm, DeploymentEvent::Disconnected)?;

        let timeout = self.options.timing.probe_timeout(request.heavy_payload);
        status.info(format!(
            "Waiting for router at {} (Timeout: {}s)...",
            request.post_change_host,
            timeout.as_secs()
        ));
        let outcome = self
            .probe
            .wait_until_reachable(&request.post_change_host, timeout, status)
            .await;
        info!(
            "Reachability wait for {} ended after {} attempts: {:?}",
            request.post_change_host,
            outcome.attempts(),
            outcome
        );

        advance(fsm, DeploymentEvent::Finished)?;
        Ok(outcome.is_reachable())
    }

    /// Connect, schedule the script and close the session on every path
    async fn apply(
        &self,
        request: &DeploymentRequest,
        local_path: &Path,
        fsm: &mut DeploymentFsm,
        status: &mut Recorder,
    ) -> Result<(), DeployerError> {
        advance(fsm, DeploymentEvent::Start)?;
        status.info(format!("Connecting to {}...", request.target));
        let mut session = self
            .connector
            .connect(&request.target, self.options.connect_timeout)
            .await
            .map_err(|e| DeployerError::ConnectionError(e.to_string()))?;
        status.info(format!("Connected to {}", request.target));
        advance(fsm, DeploymentEvent::Connected)?;

        let scheduled = self
            .schedule_script(&mut session, request, local_path, fsm, status)
            .await;

        if let Err(e) = session.close().await {
            status.warn(format!("Session to {} did not close cleanly: {}", request.target, e));
        } else if scheduled.is_ok() {
            status.info(format!("Disconnected from {}", request.target));
        }

        scheduled
    }

    async fn schedule_script(
        &self,
        session: &mut C::Session,
        request: &DeploymentRequest,
        local_path: &Path,
        fsm: &mut DeploymentFsm,
        status: &mut Recorder,
    ) -> Result<(), DeployerError> {
        status.info("Detecting storage path...");
        let prefix = detect_storage_prefix(session).await;
        status.info(format!("Detected storage path: {}", prefix));
        advance(fsm, DeploymentEvent::StorageDetected)?;

        let remote_path = prefix.remote_path(REMOTE_SCRIPT_NAME);
        status.info(format!("Uploading {} to {}...", REMOTE_SCRIPT_NAME, remote_path));
        session
            .upload(local_path, &remote_path)
            .await
            .map_err(|e| DeployerError::TransferError(e.to_string()))?;
        status.info(format!("Uploaded {}", remote_path));
        advance(fsm, DeploymentEvent::Uploaded)?;

        status.info("Scheduling configuration apply...");
        session
            .exec(&remove_schedule_command(DEPLOY_SCHEDULE_NAME))
            .await
            .map_err(DeployerError::from_session)?;
        status.info(format!("Cleared previous {} schedule", DEPLOY_SCHEDULE_NAME));

        let offset = self.options.timing.start_offset(request.heavy_payload);
        let output = session
            .exec(&add_schedule_command(DEPLOY_SCHEDULE_NAME, &remote_path, offset))
            .await
            .map_err(DeployerError::from_session)?;
        if let Some(error) = output.error_text() {
            return Err(DeployerError::SchedulingError(error.to_string()));
        }
        advance(fsm, DeploymentEvent::Scheduled)?;

        status.info(format!(
            "Configuration scheduled (Offset: {}). Disconnecting...",
            routeros_time(offset)
        ));
        Ok(())
    }
}

fn advance(fsm: &mut DeploymentFsm, event: DeploymentEvent) -> Result<(), DeployerError> {
    fsm.process(event).map_err(DeployerError::TransitionError)
}
