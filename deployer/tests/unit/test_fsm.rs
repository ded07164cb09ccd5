//! FSM unit tests

use titan_deployer::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentPhase};

fn advance_to_scheduling(fsm: &mut DeploymentFsm) {
    fsm.process(DeploymentEvent::Start).unwrap();
    fsm.process(DeploymentEvent::Connected).unwrap();
    fsm.process(DeploymentEvent::StorageDetected).unwrap();
    fsm.process(DeploymentEvent::Uploaded).unwrap();
}

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.phase(), DeploymentPhase::Pending);
    assert!(fsm.error().is_none());
    assert!(!fsm.is_terminal());
}

#[test]
fn test_fsm_deploy_success_flow() {
    let mut fsm = DeploymentFsm::new();
    advance_to_scheduling(&mut fsm);
    assert_eq!(fsm.phase(), DeploymentPhase::Scheduling);

    // Scheduling -> Disconnecting
    fsm.process(DeploymentEvent::Scheduled).unwrap();
    assert_eq!(fsm.phase(), DeploymentPhase::Disconnecting);

    // Disconnecting -> AwaitingDevice
    fsm.process(DeploymentEvent::Disconnected).unwrap();
    assert_eq!(fsm.phase(), DeploymentPhase::AwaitingDevice);

    // AwaitingDevice -> Succeeded
    fsm.process(DeploymentEvent::Finished).unwrap();
    assert_eq!(fsm.phase(), DeploymentPhase::Succeeded);
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_failure_while_scheduling() {
    let mut fsm = DeploymentFsm::new();
    advance_to_scheduling(&mut fsm);

    fsm.process(DeploymentEvent::Fail("Scheduler Error: bad".to_string()))
        .unwrap();

    assert_eq!(fsm.phase(), DeploymentPhase::Failed);
    assert_eq!(fsm.error(), Some("Scheduler Error: bad"));
}

#[test]
fn test_fsm_cannot_fail_after_scheduling() {
    let mut fsm = DeploymentFsm::new();
    advance_to_scheduling(&mut fsm);
    fsm.process(DeploymentEvent::Scheduled).unwrap();
    fsm.process(DeploymentEvent::Disconnected).unwrap();

    // an unreachable device is not a failure once the script is scheduled
    assert!(fsm.process(DeploymentEvent::Fail("timeout".to_string())).is_err());
    assert_eq!(fsm.phase(), DeploymentPhase::AwaitingDevice);
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = DeploymentFsm::new();

    // Cannot upload before connecting
    assert!(fsm.process(DeploymentEvent::Uploaded).is_err());

    // Terminal phases stay put
    fsm.process(DeploymentEvent::Fail("refused".to_string())).unwrap();
    assert!(fsm.process(DeploymentEvent::Start).is_err());
    assert!(fsm.process(DeploymentEvent::Fail("again".to_string())).is_err());
    assert_eq!(fsm.error(), Some("refused"));
}

#[test]
fn test_phase_serialization() {
    let json = serde_json::to_string(&DeploymentPhase::AwaitingDevice).unwrap();
    assert_eq!(json, "\"awaiting_device\"");
}
