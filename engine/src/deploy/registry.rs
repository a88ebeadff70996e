//! Deployment registry
//!
//! Live statuses keyed by deployment id plus a bounded, newest-first history
//! of results per fragment. Shared between concurrent pipelines.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use deploy_models::{DeploymentResult, DeploymentState, DeploymentStatus};

use crate::deploy::fsm::{self, DeploymentEvent};

/// Default number of results kept per fragment
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// In-memory deployment registry
pub struct DeploymentRegistry {
    deployments: RwLock<HashMap<String, DeploymentStatus>>,
    history: RwLock<HashMap<String, VecDeque<DeploymentResult>>>,
    history_capacity: usize,
}

impl DeploymentRegistry {
    /// Create a new registry keeping `history_capacity` results per fragment
    pub fn new(history_capacity: usize) -> Self {
        Self {
            deployments: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
            history_capacity: history_capacity.max(1),
        }
    }

    /// Register a fresh status
    pub fn insert(&self, status: DeploymentStatus) {
        let mut deployments = self.deployments.write().unwrap_or_else(|e| e.into_inner());
        deployments.insert(status.deployment_id.clone(), status);
    }

    /// Snapshot of a deployment's status
    pub fn get(&self, deployment_id: &str) -> Option<DeploymentStatus> {
        let deployments = self.deployments.read().unwrap_or_else(|e| e.into_inner());
        deployments.get(deployment_id).cloned()
    }

    /// Current state of a deployment
    pub fn state(&self, deployment_id: &str) -> Option<DeploymentState> {
        let deployments = self.deployments.read().unwrap_or_else(|e| e.into_inner());
        deployments.get(deployment_id).map(|s| s.status)
    }

    /// Mutate a deployment's status in place
    pub fn update<R>(
        &self,
        deployment_id: &str,
        f: impl FnOnce(&mut DeploymentStatus) -> R,
    ) -> Option<R> {
        let mut deployments = self.deployments.write().unwrap_or_else(|e| e.into_inner());
        deployments.get_mut(deployment_id).map(f)
    }

    /// Cancel a deployment if, and only if, it is building
    pub fn cancel(&self, deployment_id: &str) -> bool {
        self.update(deployment_id, |status| {
            if status.status != DeploymentState::Building {
                return false;
            }
            let cancelled = fsm::apply(status, DeploymentEvent::Cancel).is_ok();
            if cancelled {
                status.log("Deployment cancelled by user");
            }
            cancelled
        })
        .unwrap_or(false)
    }

    /// Ids of every known deployment
    pub fn ids(&self) -> Vec<String> {
        let deployments = self.deployments.read().unwrap_or_else(|e| e.into_inner());
        deployments.keys().cloned().collect()
    }

    /// Prepend `result` to the history of `fragment_key`, evicting the oldest
    pub fn record_result(&self, fragment_key: &str, result: DeploymentResult) {
        let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
        let entries = history.entry(fragment_key.to_string()).or_default();
        entries.push_front(result);
        entries.truncate(self.history_capacity);
    }

    /// History of `fragment_key`, newest first
    pub fn history_for(&self, fragment_key: &str) -> Vec<DeploymentResult> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        history
            .get(fragment_key)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of tracked deployments
    pub fn len(&self) -> usize {
        let deployments = self.deployments.read().unwrap_or_else(|e| e.into_inner());
        deployments.len()
    }

    /// Check if no deployment is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeploymentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
