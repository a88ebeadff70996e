//! Build runner
//!
//! Runs the build commands of a deployment in order through a
//! [`CommandExecutor`], logging each one into the deployment status.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use deploy_models::DeploymentState;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::deploy::artifacts::ArtifactSet;
use crate::deploy::registry::DeploymentRegistry;
use crate::errors::EngineError;
use crate::filesys::dir::Dir;

/// Lines of stderr kept in a build error
const STDERR_TAIL_LINES: usize = 20;

/// Executes build commands for a deployment
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Called once before the first command
    async fn prepare(&self, _deployment_id: &str, _artifacts: &ArtifactSet) -> Result<(), EngineError> {
        Ok(())
    }

    async fn execute(&self, deployment_id: &str, command: &str) -> Result<(), EngineError>;

    /// Called once after the last command, whatever the outcome
    async fn finish(&self, _deployment_id: &str) {}
}

/// Records commands as completed without running them
#[derive(Debug, Default, Clone)]
pub struct SimulatedExecutor;

#[async_trait]
impl CommandExecutor for SimulatedExecutor {
    async fn execute(&self, deployment_id: &str, command: &str) -> Result<(), EngineError> {
        debug!("[{}] simulated: {}", deployment_id, command);
        Ok(())
    }
}

/// Runs commands with `sh -c` in a per-deployment work directory
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    work_dir: Dir,
}

impl ShellExecutor {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: Dir::new(work_dir),
        }
    }

    fn deployment_dir(&self, deployment_id: &str) -> Dir {
        self.work_dir.subdir(deployment_id)
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn prepare(&self, deployment_id: &str, artifacts: &ArtifactSet) -> Result<(), EngineError> {
        let dir = self.deployment_dir(deployment_id);
        debug!("Writing {} files to {}", artifacts.len(), dir.path().display());
        artifacts.write_to(&dir).await
    }

    async fn execute(&self, deployment_id: &str, command: &str) -> Result<(), EngineError> {
        let dir = self.deployment_dir(deployment_id);

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EngineError::Build(format!("Failed to run `{}`: {}", command, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());

        Err(EngineError::Build(format!(
            "`{}` exited with {}: {}",
            command,
            code,
            tail.trim()
        )))
    }

    async fn finish(&self, deployment_id: &str) {
        if let Err(e) = self.deployment_dir(deployment_id).delete().await {
            warn!("Failed to clean work directory of {}: {}", deployment_id, e);
        }
    }
}

/// Runs build commands for deployments
pub struct BuildRunner<'a> {
    executor: &'a dyn CommandExecutor,
    registry: &'a DeploymentRegistry,
}

impl<'a> BuildRunner<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, registry: &'a DeploymentRegistry) -> Self {
        Self { executor, registry }
    }

    /// Run `commands` in order; the first failure aborts the build
    pub async fn run(
        &self,
        deployment_id: &str,
        commands: &[String],
        artifacts: &ArtifactSet,
    ) -> Result<(), EngineError> {
        self.executor.prepare(deployment_id, artifacts).await?;
        let result = self.run_commands(deployment_id, commands).await;
        self.executor.finish(deployment_id).await;
        result
    }

    async fn run_commands(&self, deployment_id: &str, commands: &[String]) -> Result<(), EngineError> {
        for command in commands {
            if self.registry.state(deployment_id) == Some(DeploymentState::Cancelled) {
                return Err(EngineError::Cancelled);
            }

            info!("[{}] Running: {}", deployment_id, command);
            self.log(deployment_id, format!("🔧 Running: {}", command));

            self.executor.execute(deployment_id, command).await?;

            self.log(deployment_id, format!("  ✅ {} completed", command));
        }
        Ok(())
    }

    fn log(&self, deployment_id: &str, line: String) {
        self.registry.update(deployment_id, |status| status.log(line));
    }
}
