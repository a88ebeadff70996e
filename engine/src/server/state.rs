//! Server state

use std::sync::Arc;

use crate::deploy::DeploymentEngine;

/// Server state shared across handlers
pub struct ServerState {
    pub engine: Arc<DeploymentEngine>,
}

impl ServerState {
    pub fn new(engine: Arc<DeploymentEngine>) -> Self {
        Self { engine }
    }
}
