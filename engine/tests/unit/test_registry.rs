//! Registry unit tests

use fragdeploy::deploy::fsm::{apply, DeploymentEvent};
use fragdeploy::deploy::registry::{DeploymentRegistry, DEFAULT_HISTORY_CAPACITY};
use fragdeploy::models::{DeploymentResult, DeploymentState, DeploymentStatus};

fn result(id: &str) -> DeploymentResult {
    DeploymentResult::unsuccessful(&DeploymentStatus::new(id), "boom", "BuildError")
}

fn in_state(registry: &DeploymentRegistry, id: &str, events: Vec<DeploymentEvent>) {
    let mut status = DeploymentStatus::new(id);
    for event in events {
        apply(&mut status, event).unwrap();
    }
    registry.insert(status);
}

#[test]
fn test_history_is_capped_and_newest_first() {
    let registry = DeploymentRegistry::default();

    for i in 0..11 {
        registry.record_result("Dashboard", result(&format!("deploy_{}", i)));
    }

    let history = registry.history_for("Dashboard");
    assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
    assert_eq!(history[0].deployment_id, "deploy_10");
    assert_eq!(history[9].deployment_id, "deploy_1");
    assert!(history.iter().all(|r| r.deployment_id != "deploy_0"));
}

#[test]
fn test_history_is_per_fragment() {
    let registry = DeploymentRegistry::new(2);
    registry.record_result("a", result("deploy_a"));
    registry.record_result("b", result("deploy_b"));

    assert_eq!(registry.history_for("a").len(), 1);
    assert_eq!(registry.history_for("b")[0].deployment_id, "deploy_b");
    assert!(registry.history_for("unknown").is_empty());
}

#[test]
fn test_cancel_building_deployment() {
    let registry = DeploymentRegistry::default();
    in_state(&registry, "deploy_1", vec![DeploymentEvent::Start]);

    assert!(registry.cancel("deploy_1"));
    assert_eq!(registry.state("deploy_1"), Some(DeploymentState::Cancelled));

    // Already cancelled
    assert!(!registry.cancel("deploy_1"));
    assert_eq!(registry.state("deploy_1"), Some(DeploymentState::Cancelled));
}

#[test]
fn test_cancel_rejected_outside_building() {
    let registry = DeploymentRegistry::default();
    in_state(&registry, "pending", vec![]);
    in_state(
        &registry,
        "deploying",
        vec![DeploymentEvent::Start, DeploymentEvent::Dispatch],
    );
    in_state(
        &registry,
        "done",
        vec![
            DeploymentEvent::Start,
            DeploymentEvent::Dispatch,
            DeploymentEvent::Succeed,
        ],
    );

    assert!(!registry.cancel("pending"));
    assert!(!registry.cancel("deploying"));
    assert!(!registry.cancel("done"));
    assert!(!registry.cancel("missing"));
    assert_eq!(registry.state("done"), Some(DeploymentState::Success));
}

#[test]
fn test_update_returns_none_for_unknown() {
    let registry = DeploymentRegistry::default();
    assert!(registry.is_empty());
    assert!(registry.update("missing", |status| status.advance(10)).is_none());

    in_state(&registry, "deploy_1", vec![]);
    registry.update("deploy_1", |status| status.advance(40));
    assert_eq!(registry.get("deploy_1").map(|s| s.progress), Some(40));
    assert_eq!(registry.len(), 1);
}
