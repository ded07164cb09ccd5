//! Deployment module

pub mod fsm;
pub mod orchestrator;
pub mod request;
pub mod reset;
pub mod schedule;
pub mod storage;

pub use fsm::{DeploymentEvent, DeploymentFsm, DeploymentPhase};
pub use orchestrator::{DeployOptions, Deployer};
pub use request::{DeploymentOutcome, DeploymentRequest, ScriptPayload};
pub use reset::{ResetOptions, ResetOutcome, Resetter, RESET_COMMAND};
pub use schedule::{TimingPolicy, DEPLOY_SCHEDULE_NAME, REMOTE_SCRIPT_NAME};
pub use storage::{detect_storage_prefix, StoragePrefix};
