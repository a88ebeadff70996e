//! Finite State Machine for deployment pipelines
//!
//! `pending -> building -> deploying -> success`, with `failed` reachable from
//! every non-terminal state and `cancelled` only from `building`. Terminal
//! states reject every event.

use deploy_models::{DeploymentState, DeploymentStatus};

/// Deployment event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentEvent {
    /// Validation passed, start building
    Start,

    /// Local artifacts ready, hand over to the provider
    Dispatch,

    /// Provider reported a successful terminal state
    Succeed,

    /// Any stage failed
    Fail(String),

    /// User asked to cancel
    Cancel,
}

/// Compute the state reached from `state` on `event`
pub fn transition(
    state: DeploymentState,
    event: &DeploymentEvent,
) -> Result<DeploymentState, String> {
    let next = match (state, event) {
        (DeploymentState::Pending, DeploymentEvent::Start) => DeploymentState::Building,
        (DeploymentState::Building, DeploymentEvent::Dispatch) => DeploymentState::Deploying,
        (DeploymentState::Deploying, DeploymentEvent::Succeed) => DeploymentState::Success,

        // Validation failures happen before the pipeline leaves pending
        (
            DeploymentState::Pending | DeploymentState::Building | DeploymentState::Deploying,
            DeploymentEvent::Fail(_),
        ) => DeploymentState::Failed,

        (DeploymentState::Building, DeploymentEvent::Cancel) => DeploymentState::Cancelled,

        (state, event) => {
            return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
        }
    };

    Ok(next)
}

/// Apply `event` to `status`, recording the error of a failure
pub fn apply(status: &mut DeploymentStatus, event: DeploymentEvent) -> Result<(), String> {
    let next = transition(status.status, &event)?;

    match event {
        DeploymentEvent::Fail(err) => {
            status.current_step = "Deployment failed".to_string();
            status.error = Some(err);
        }
        DeploymentEvent::Cancel => {
            status.current_step = "Deployment cancelled".to_string();
        }
        DeploymentEvent::Succeed => {
            status.current_step = "Deployment complete".to_string();
            status.advance(100);
        }
        DeploymentEvent::Start | DeploymentEvent::Dispatch => {}
    }

    status.status = next;
    Ok(())
}
