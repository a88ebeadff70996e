//! FSM unit tests

use fragdeploy::deploy::fsm::{apply, transition, DeploymentEvent};
use fragdeploy::models::{DeploymentState, DeploymentStatus};

#[test]
fn test_fsm_initial_state() {
    let status = DeploymentStatus::new("deploy_1_abc");
    assert_eq!(status.status, DeploymentState::Pending);
    assert_eq!(status.progress, 0);
    assert!(status.error.is_none());
    assert!(status.logs.is_empty());
}

#[test]
fn test_fsm_deploy_success_flow() {
    let mut status = DeploymentStatus::new("deploy_1_abc");

    // Pending -> Building
    apply(&mut status, DeploymentEvent::Start).unwrap();
    assert_eq!(status.status, DeploymentState::Building);

    // Building -> Deploying
    apply(&mut status, DeploymentEvent::Dispatch).unwrap();
    assert_eq!(status.status, DeploymentState::Deploying);

    // Deploying -> Success
    apply(&mut status, DeploymentEvent::Succeed).unwrap();
    assert_eq!(status.status, DeploymentState::Success);
    assert_eq!(status.progress, 100);
}

#[test]
fn test_fsm_deploy_failure_flow() {
    let mut status = DeploymentStatus::new("deploy_1_abc");

    apply(&mut status, DeploymentEvent::Start).unwrap();
    apply(&mut status, DeploymentEvent::Fail("npm install failed".to_string())).unwrap();

    assert_eq!(status.status, DeploymentState::Failed);
    assert_eq!(status.error.as_deref(), Some("npm install failed"));
}

#[test]
fn test_fsm_failure_before_build() {
    let mut status = DeploymentStatus::new("deploy_1_abc");
    apply(&mut status, DeploymentEvent::Fail("Validation error: empty code".to_string())).unwrap();
    assert_eq!(status.status, DeploymentState::Failed);
}

#[test]
fn test_fsm_cancel_only_while_building() {
    assert_eq!(
        transition(DeploymentState::Building, &DeploymentEvent::Cancel),
        Ok(DeploymentState::Cancelled)
    );
    assert!(transition(DeploymentState::Pending, &DeploymentEvent::Cancel).is_err());
    assert!(transition(DeploymentState::Deploying, &DeploymentEvent::Cancel).is_err());
}

#[test]
fn test_fsm_terminal_states_are_final() {
    let events = [
        DeploymentEvent::Start,
        DeploymentEvent::Dispatch,
        DeploymentEvent::Succeed,
        DeploymentEvent::Fail("late".to_string()),
        DeploymentEvent::Cancel,
    ];

    for state in [
        DeploymentState::Success,
        DeploymentState::Failed,
        DeploymentState::Cancelled,
    ] {
        for event in &events {
            assert!(transition(state, event).is_err(), "{:?} accepted {:?}", state, event);
        }
    }
}

#[test]
fn test_fsm_invalid_transition() {
    let mut status = DeploymentStatus::new("deploy_1_abc");

    // Cannot dispatch before building
    let result = apply(&mut status, DeploymentEvent::Dispatch);
    assert!(result.is_err());
    assert_eq!(status.status, DeploymentState::Pending);
}
