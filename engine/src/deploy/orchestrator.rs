//! Deployment orchestrator
//!
//! Drives one fragment through validation, build and provider hand-off while
//! keeping its [`DeploymentStatus`] current in the shared registry. Every
//! failure ends up in the status, the returned result and the history; callers
//! never see an error from [`DeploymentEngine::deploy_fragment`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use deploy_models::{
    DeploymentConfig, DeploymentProvider, DeploymentResult, DeploymentState, DeploymentStatus,
    Fragment,
};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::{BuildMode, EngineOptions};
use crate::catalog::ProviderCatalog;
use crate::deploy::artifacts::{self, ArtifactSet};
use crate::deploy::builder::{BuildRunner, CommandExecutor, ShellExecutor, SimulatedExecutor};
use crate::deploy::deps::{
    extract_dependencies, DependencyResolver, HttpPackageIndex, PackageIndex,
    DEFAULT_NPM_REGISTRY, DEFAULT_PYPI_REGISTRY,
};
use crate::deploy::fsm::{self, DeploymentEvent};
use crate::deploy::notify::{self, LogNotifier, Notifier};
use crate::deploy::registry::DeploymentRegistry;
use crate::deploy::validator;
use crate::errors::EngineError;
use crate::http::client::DEFAULT_TIMEOUT;
use crate::providers::{
    wait_for_terminal, Credentials, DeploymentRequest, DriverRegistry, PollSettings,
    ProviderEndpoints, ProviderOutcome, Submission,
};
use crate::utils::generate_deployment_id;

/// Deployment engine
pub struct DeploymentEngine {
    catalog: ProviderCatalog,
    registry: Arc<DeploymentRegistry>,
    resolver: DependencyResolver,
    executor: Arc<dyn CommandExecutor>,
    drivers: DriverRegistry,
    notifier: Arc<dyn Notifier>,
    poll: PollSettings,
}

impl DeploymentEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Engine wired from application options and provider credentials
    pub fn from_options(
        options: &EngineOptions,
        credentials: &Credentials,
    ) -> Result<Self, EngineError> {
        let index = HttpPackageIndex::new(
            &options.npm_registry,
            &options.pypi_registry,
            options.http_timeout,
        )?;
        let drivers = DriverRegistry::builtin(&options.endpoints, credentials, options.http_timeout)?;
        let executor: Arc<dyn CommandExecutor> = match &options.build_mode {
            BuildMode::Simulated => Arc::new(SimulatedExecutor),
            BuildMode::Shell { work_dir } => Arc::new(ShellExecutor::new(work_dir.clone())),
        };

        Self::builder()
            .registry(Arc::new(DeploymentRegistry::new(options.history_capacity)))
            .package_index(Arc::new(index))
            .executor(executor)
            .drivers(drivers)
            .poll(options.poll)
            .build()
    }

    pub fn registry(&self) -> &Arc<DeploymentRegistry> {
        &self.registry
    }

    /// Every provider a fragment can be deployed to
    pub fn providers(&self) -> &[DeploymentProvider] {
        self.catalog.all()
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    /// Run a whole deployment and return its result
    pub async fn deploy_fragment(
        &self,
        fragment: &Fragment,
        config: &DeploymentConfig,
    ) -> DeploymentResult {
        let deployment_id = self.begin();
        self.execute(&deployment_id, fragment, config).await
    }

    /// Start a deployment in the background; its id is queryable immediately
    pub fn spawn_deployment(
        self: &Arc<Self>,
        fragment: Fragment,
        config: DeploymentConfig,
    ) -> (String, JoinHandle<DeploymentResult>) {
        let deployment_id = self.begin();

        let engine = Arc::clone(self);
        let id = deployment_id.clone();
        let handle =
            tokio::spawn(async move { engine.execute(&id, &fragment, &config).await });

        (deployment_id, handle)
    }

    pub fn get_deployment_status(&self, deployment_id: &str) -> Option<DeploymentStatus> {
        self.registry.get(deployment_id)
    }

    /// Results of a fragment, newest first
    pub fn get_deployment_history(&self, fragment_key: &str) -> Vec<DeploymentResult> {
        self.registry.history_for(fragment_key)
    }

    /// Cancel a deployment; honoured only while it is building
    pub fn cancel_deployment(&self, deployment_id: &str) -> bool {
        let cancelled = self.registry.cancel(deployment_id);
        if cancelled {
            info!("Deployment {} cancelled", deployment_id);
        }
        cancelled
    }

    /// Request a rollback of a successful deployment.
    ///
    /// Only the intent is recorded; provider-side rollback is not performed.
    pub fn rollback_deployment(&self, deployment_id: &str) -> bool {
        self.registry
            .update(deployment_id, |status| {
                if status.status != DeploymentState::Success {
                    return false;
                }
                status.log("↩️ Rollback requested");
                true
            })
            .inspect(|accepted| {
                if *accepted {
                    info!("Rollback requested for deployment {}", deployment_id);
                }
            })
            .unwrap_or(false)
    }

    // ================================ PIPELINE ================================ //

    fn begin(&self) -> String {
        let deployment_id = generate_deployment_id();
        self.registry.insert(DeploymentStatus::new(&deployment_id));
        deployment_id
    }

    async fn execute(
        &self,
        deployment_id: &str,
        fragment: &Fragment,
        config: &DeploymentConfig,
    ) -> DeploymentResult {
        let started = Instant::now();
        info!(
            "Deployment {} of '{}' to {} started",
            deployment_id,
            fragment.title,
            config.provider_id()
        );

        let result = match self.run(deployment_id, fragment, config, started).await {
            Ok(result) => result,
            Err(err) => self.fail(deployment_id, err),
        };

        self.registry.record_result(fragment.history_key(), result.clone());
        result
    }

    async fn run(
        &self,
        deployment_id: &str,
        fragment: &Fragment,
        config: &DeploymentConfig,
        started: Instant,
    ) -> Result<DeploymentResult, EngineError> {
        let provider = validator::validate(fragment, config, &self.catalog)?;
        let driver = self.drivers.get(&provider.id).ok_or_else(|| {
            EngineError::Config(format!("No driver registered for {}", provider.id))
        })?;

        // building
        self.apply(deployment_id, DeploymentEvent::Start)?;
        self.progress(
            deployment_id,
            10,
            "Preparing deployment",
            format!("📦 Preparing deployment to {}", provider.name),
        );

        self.ensure_active(deployment_id)?;
        let artifacts = artifacts::generate(fragment, config, provider);
        let size = artifacts.total_size();
        if size > provider.build_settings.max_deployment_size {
            return Err(EngineError::Build(format!(
                "Deployment size {} bytes exceeds the {} limit of {} bytes",
                size, provider.name, provider.build_settings.max_deployment_size
            )));
        }
        self.progress(
            deployment_id,
            25,
            "Generating build files",
            format!("📝 Generated {} build files ({} bytes)", artifacts.len(), size),
        );

        self.ensure_active(deployment_id)?;
        self.progress(
            deployment_id,
            30,
            "Building application",
            "🏗️ Building application...".to_string(),
        );
        self.progress(
            deployment_id,
            40,
            "Build files ready",
            format!(
                "📄 Build files: {}",
                artifacts.paths().collect::<Vec<_>>().join(", ")
            ),
        );

        self.ensure_active(deployment_id)?;
        let deps = extract_dependencies(&fragment.code, fragment.template);
        if !deps.is_empty() {
            self.log(
                deployment_id,
                format!("🔗 Checking {} dependencies", deps.len()),
            );
        }
        self.resolver
            .validate_availability(&deps, fragment.template)
            .await?;
        self.progress(
            deployment_id,
            50,
            "Dependencies resolved",
            "✅ Dependencies available".to_string(),
        );

        self.ensure_active(deployment_id)?;
        let commands = artifacts::build_commands(fragment.template, config);
        BuildRunner::new(self.executor.as_ref(), &self.registry)
            .run(deployment_id, &commands, &artifacts)
            .await?;
        self.progress(
            deployment_id,
            70,
            "Build commands completed",
            "✅ Build completed".to_string(),
        );

        self.ensure_active(deployment_id)?;
        self.progress(
            deployment_id,
            80,
            "Build optimized",
            format!("⚡ Optimized build output for {}", fragment.template),
        );
        let build_time_ms = started.elapsed().as_millis() as u64;
        self.registry
            .update(deployment_id, |status| status.build_time_ms = build_time_ms);

        // deploying
        self.apply(deployment_id, DeploymentEvent::Dispatch)?;
        self.progress(
            deployment_id,
            80,
            &format!("Deploying to {}", provider.name),
            format!("🚀 Deploying to {}...", provider.name),
        );

        let request = DeploymentRequest {
            deployment_id,
            fragment,
            config,
            provider,
            artifacts: &artifacts,
        };
        let submission = driver.submit(&request).await?;
        self.progress(
            deployment_id,
            85,
            "Submitted to provider",
            format!("📤 Submitted to {}", provider.name),
        );

        let outcome = match submission {
            Submission::Completed(outcome) => outcome,
            Submission::Pending(handle) => {
                wait_for_terminal(driver.as_ref(), &handle, self.poll, |line| {
                    self.log(deployment_id, line.to_string());
                })
                .await?
            }
        };
        self.progress(
            deployment_id,
            90,
            "Provider finished",
            format!("{} deployment status: {}", provider.name, outcome.state),
        );

        if !outcome.success {
            return Err(EngineError::ProviderApi {
                provider: provider.name.clone(),
                status: 200,
                message: format!("deployment finished in state {}", outcome.state),
            });
        }

        let status = self.succeed(deployment_id, &outcome)?;
        let mut result = success_result(&status, outcome, &artifacts);
        info!(
            "Deployment {} is live at {}",
            deployment_id,
            result.url.as_deref().unwrap_or("-")
        );

        self.post_deployment(deployment_id, config, &result).await;
        result.logs = self
            .registry
            .get(deployment_id)
            .map(|s| s.logs)
            .unwrap_or_default();
        Ok(result)
    }

    fn succeed(
        &self,
        deployment_id: &str,
        outcome: &ProviderOutcome,
    ) -> Result<DeploymentStatus, EngineError> {
        self.registry
            .update(deployment_id, |status| {
                fsm::apply(status, DeploymentEvent::Succeed).map_err(EngineError::Internal)?;
                status.url = outcome.url.clone();
                status.preview_url = outcome.preview_url.clone();
                status.deployed_at = Some(outcome.deployed_at.unwrap_or_else(Utc::now));
                status.log(format!(
                    "🎉 Deployment successful: {}",
                    outcome.url.as_deref().unwrap_or("-")
                ));
                Ok(status.clone())
            })
            .unwrap_or_else(|| Err(unknown(deployment_id)))
    }

    async fn post_deployment(
        &self,
        deployment_id: &str,
        config: &DeploymentConfig,
        result: &DeploymentResult,
    ) {
        for channel in notify::channels(config) {
            match self.notifier.send(&channel, result).await {
                Ok(()) => self.log(deployment_id, format!("📣 Notification sent via {}", channel)),
                Err(e) => {
                    warn!("Notification via {} failed: {}", channel, e);
                    self.log(
                        deployment_id,
                        format!("⚠️ Notification via {} failed: {}", channel, e),
                    );
                }
            }
        }

        if config.analytics_enabled {
            self.log(deployment_id, "📊 Analytics enabled".to_string());
        }
        if let Some(domain) = &config.custom_domain {
            self.log(deployment_id, format!("🌐 Custom domain: {}", domain));
        }
    }

    fn fail(&self, deployment_id: &str, err: EngineError) -> DeploymentResult {
        let requested = matches!(err, EngineError::Cancelled);

        // Decide under the same lock that records the outcome
        let (status, cancelled) = self
            .registry
            .update(deployment_id, |status| {
                let cancelled = requested || status.status == DeploymentState::Cancelled;
                if cancelled {
                    status.log("🛑 Deployment stopped after cancellation");
                } else {
                    status.log(format!("❌ Deployment failed: {}", err));
                    if let Err(e) = fsm::apply(status, DeploymentEvent::Fail(err.to_string())) {
                        warn!("{}", e);
                    }
                }
                (status.clone(), cancelled)
            })
            .unwrap_or_else(|| (DeploymentStatus::new(deployment_id), requested));

        if cancelled {
            info!("Deployment {} stopped: cancelled", deployment_id);
            DeploymentResult::unsuccessful(&status, "Deployment cancelled by user", "Cancelled")
        } else {
            error!("Deployment {} failed: {}", deployment_id, err);
            DeploymentResult::unsuccessful(&status, err.to_string(), err.kind())
        }
    }

    // ================================ HELPERS ================================= //

    /// Apply an FSM event; a deployment cancelled meanwhile reports `Cancelled`
    fn apply(&self, deployment_id: &str, event: DeploymentEvent) -> Result<(), EngineError> {
        self.registry
            .update(deployment_id, |status| {
                if status.status == DeploymentState::Cancelled {
                    return Err(EngineError::Cancelled);
                }
                fsm::apply(status, event).map_err(EngineError::Internal)
            })
            .unwrap_or_else(|| Err(unknown(deployment_id)))
    }

    fn ensure_active(&self, deployment_id: &str) -> Result<(), EngineError> {
        match self.registry.state(deployment_id) {
            Some(DeploymentState::Cancelled) => Err(EngineError::Cancelled),
            Some(_) => Ok(()),
            None => Err(unknown(deployment_id)),
        }
    }

    fn progress(&self, deployment_id: &str, progress: u8, step: &str, line: String) {
        info!("[{}] {}% {}", deployment_id, progress, step);
        self.registry.update(deployment_id, |status| {
            status.advance(progress);
            status.current_step = step.to_string();
            status.log(line);
        });
    }

    fn log(&self, deployment_id: &str, line: String) {
        self.registry.update(deployment_id, |status| status.log(line));
    }
}

fn unknown(deployment_id: &str) -> EngineError {
    EngineError::Internal(format!("Unknown deployment {}", deployment_id))
}

fn success_result(
    status: &DeploymentStatus,
    outcome: ProviderOutcome,
    artifacts: &ArtifactSet,
) -> DeploymentResult {
    let mut metadata: BTreeMap<String, serde_json::Value> = outcome.metadata;
    metadata.insert("artifactDigest".to_string(), json!(artifacts.digest()));
    metadata.insert("providerState".to_string(), json!(outcome.state));

    DeploymentResult {
        success: true,
        deployment_id: status.deployment_id.clone(),
        url: status.url.clone(),
        preview_url: status.preview_url.clone(),
        error: None,
        error_kind: None,
        logs: status.logs.clone(),
        build_time_ms: status.build_time_ms,
        deployment_size: if outcome.deployment_size > 0 {
            outcome.deployment_size
        } else {
            artifacts.total_size()
        },
        status: status.status,
        deployed_at: status.deployed_at,
        metadata,
    }
}

/// Assembles a [`DeploymentEngine`] from its collaborators
#[derive(Default)]
pub struct EngineBuilder {
    catalog: Option<ProviderCatalog>,
    registry: Option<Arc<DeploymentRegistry>>,
    index: Option<Arc<dyn PackageIndex>>,
    executor: Option<Arc<dyn CommandExecutor>>,
    drivers: Option<DriverRegistry>,
    notifier: Option<Arc<dyn Notifier>>,
    poll: Option<PollSettings>,
}

impl EngineBuilder {
    pub fn catalog(mut self, catalog: ProviderCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn registry(mut self, registry: Arc<DeploymentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn package_index(mut self, index: Arc<dyn PackageIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn drivers(mut self, drivers: DriverRegistry) -> Self {
        self.drivers = Some(drivers);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn poll(mut self, poll: PollSettings) -> Self {
        self.poll = Some(poll);
        self
    }

    /// Build the engine; unset collaborators get their production defaults
    pub fn build(self) -> Result<DeploymentEngine, EngineError> {
        let index: Arc<dyn PackageIndex> = match self.index {
            Some(index) => index,
            None => Arc::new(HttpPackageIndex::new(
                DEFAULT_NPM_REGISTRY,
                DEFAULT_PYPI_REGISTRY,
                DEFAULT_TIMEOUT,
            )?),
        };
        let drivers = match self.drivers {
            Some(drivers) => drivers,
            None => DriverRegistry::builtin(
                &ProviderEndpoints::default(),
                &Credentials::from_env(),
                DEFAULT_TIMEOUT,
            )?,
        };

        Ok(DeploymentEngine {
            catalog: self.catalog.unwrap_or_default(),
            registry: self.registry.unwrap_or_default(),
            resolver: DependencyResolver::new(index),
            executor: self.executor.unwrap_or_else(|| Arc::new(SimulatedExecutor)),
            drivers,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            poll: self.poll.unwrap_or_default(),
        })
    }
}
