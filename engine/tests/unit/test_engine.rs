//! Deployment engine tests against mocked registries and provider APIs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fragdeploy::deploy::artifacts::ArtifactSet;
use fragdeploy::deploy::builder::CommandExecutor;
use fragdeploy::errors::EngineError;
use fragdeploy::models::{DeploymentConfig, DeploymentState, Fragment, TemplateId};
use fragdeploy::providers::{Credentials, DriverRegistry, ProviderEndpoints};
use mockito::Matcher;
use tokio::sync::Notify;

use crate::common::{engine, engine_builder};

const NEXT_PAGE: &str = "export default function Home() {\n  return <h1>Hello</h1>;\n}\n";

/// Keeps the generated `requirements.txt` and every executed command
#[derive(Default)]
struct RecordingExecutor {
    requirements: Mutex<Option<String>>,
    commands: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn prepare(&self, _deployment_id: &str, artifacts: &ArtifactSet) -> Result<(), EngineError> {
        *self.requirements.lock().unwrap() = artifacts.get("requirements.txt").map(str::to_string);
        Ok(())
    }

    async fn execute(&self, _deployment_id: &str, command: &str) -> Result<(), EngineError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

/// Fails every command it is given
#[derive(Default)]
struct FailingExecutor {
    commands: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandExecutor for FailingExecutor {
    async fn execute(&self, _deployment_id: &str, command: &str) -> Result<(), EngineError> {
        self.commands.lock().unwrap().push(command.to_string());
        Err(EngineError::Build(format!("{} exited with status 1", command)))
    }
}

/// Signals when a command starts, then takes `delay` to finish it
struct SlowExecutor {
    started: Arc<Notify>,
    delay: Duration,
}

#[async_trait]
impl CommandExecutor for SlowExecutor {
    async fn execute(&self, _deployment_id: &str, _command: &str) -> Result<(), EngineError> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_empty_code_fails_validation() {
    let mut server = mockito::Server::new_async().await;
    let untouched = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Empty", TemplateId::Nextjs, "   ");
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.error_kind.as_deref(), Some("ValidationError"));
    assert_eq!(result.logs.len(), 1);
    assert!(result.logs[0].contains("Fragment code is required"));

    let status = engine.get_deployment_status(&result.deployment_id).unwrap();
    assert_eq!(status.status, DeploymentState::Failed);
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_unsupported_template_makes_no_http_calls() {
    let mut server = mockito::Server::new_async().await;
    let posts = server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let gets = server.mock("GET", Matcher::Any).expect(0).create_async().await;
    let engine = engine(&server.url());

    let fragment = Fragment::new(
        "Chat Demo",
        TemplateId::Gradio,
        "import gradio as gr\ngr.Interface(fn=lambda x: x, inputs='text', outputs='text')\n",
    );
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert_eq!(result.error_kind.as_deref(), Some("ValidationError"));
    assert!(result.error.unwrap().contains("not supported by Vercel"));
    posts.assert_async().await;
    gets.assert_async().await;
}

#[tokio::test]
async fn test_render_deploy_with_python_dependency() {
    let mut server = mockito::Server::new_async().await;
    let pypi = server
        .mock("GET", "/pypi/pandas/json")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let service = server
        .mock("POST", "/v1/services")
        .match_header("authorization", "Bearer test-token")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"srv-1","name":"data-explorer"}"#)
        .create_async()
        .await;
    let deploy = server
        .mock("POST", "/v1/services/srv-1/deploys")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dep-1"}"#)
        .create_async()
        .await;

    let executor = Arc::new(RecordingExecutor::default());
    let engine = engine_builder(&server.url())
        .executor(executor.clone())
        .build()
        .unwrap();

    let fragment = Fragment::new(
        "Data Explorer",
        TemplateId::CodeInterpreter,
        "import pandas as pd\n\nprint(pd.DataFrame({'a': [1, 2]}).describe())\n",
    );
    let mut config = DeploymentConfig::for_provider("render");
    config.webhook_url = Some("https://hooks.example.com/deploy".to_string());

    let result = engine.deploy_fragment(&fragment, &config).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.status, DeploymentState::Success);
    assert_eq!(result.url.as_deref(), Some("https://data-explorer.onrender.com"));
    assert!(result.deployed_at.is_some());
    assert!(result.deployment_size > 0);
    assert_eq!(result.metadata["serviceId"], "srv-1");
    assert!(result.metadata.contains_key("artifactDigest"));
    assert!(result
        .logs
        .iter()
        .any(|l| l.contains("Notification sent via webhook https://hooks.example.com/deploy")));

    let requirements = executor.requirements.lock().unwrap().clone().unwrap();
    assert!(requirements.lines().any(|l| l == "pandas"));
    assert_eq!(
        *executor.commands.lock().unwrap(),
        vec!["pip install -r requirements.txt".to_string()]
    );

    let status = engine.get_deployment_status(&result.deployment_id).unwrap();
    assert_eq!(status.progress, 100);

    pypi.assert_async().await;
    service.assert_async().await;
    deploy.assert_async().await;
}

#[tokio::test]
async fn test_missing_dependency_stops_before_build() {
    let mut server = mockito::Server::new_async().await;
    let npm = server
        .mock("GET", "/totally-fake-pkg-xyz")
        .with_status(404)
        .with_body(r#"{"error":"Not found"}"#)
        .create_async()
        .await;
    let vercel = server
        .mock("POST", "/v13/deployments")
        .expect(0)
        .create_async()
        .await;

    let executor = Arc::new(RecordingExecutor::default());
    let engine = engine_builder(&server.url())
        .executor(executor.clone())
        .build()
        .unwrap();

    let fragment = Fragment::new(
        "Broken",
        TemplateId::Nextjs,
        "import fake from 'totally-fake-pkg-xyz';\nexport default function Home() { return fake(); }\n",
    );
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.error_kind.as_deref(), Some("DependencyError"));
    assert!(result.error.unwrap().contains("totally-fake-pkg-xyz"));
    assert!(!result.logs.iter().any(|l| l.contains("Running:")));
    assert!(executor.commands.lock().unwrap().is_empty());

    npm.assert_async().await;
    vercel.assert_async().await;
}

#[tokio::test]
async fn test_vercel_deploy_polls_until_ready() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/v13/deployments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dpl_1","url":"hello-app.vercel.app"}"#)
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/v13/deployments/dpl_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":"dpl_1","readyState":"READY","url":"hello-app.vercel.app","alias":["hello.vercel.app"]}"#,
        )
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Hello App", TemplateId::Nextjs, NEXT_PAGE);
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.url.as_deref(), Some("https://hello-app.vercel.app"));
    assert_eq!(result.preview_url.as_deref(), Some("https://hello.vercel.app"));
    assert_eq!(result.metadata["vercelId"], "dpl_1");
    assert_eq!(result.metadata["providerState"], "READY");

    create.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn test_vercel_deploy_times_out() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v13/deployments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dpl_2"}"#)
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/v13/deployments/dpl_2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dpl_2","readyState":"BUILDING"}"#)
        .expect(3)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Slow App", TemplateId::Nextjs, NEXT_PAGE);
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.error_kind.as_deref(), Some("TimeoutError"));
    assert!(result
        .logs
        .iter()
        .any(|l| l == "Vercel deployment status: BUILDING"));

    poll.assert_async().await;
}

#[tokio::test]
async fn test_vercel_error_state_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v13/deployments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dpl_3"}"#)
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/v13/deployments/dpl_3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dpl_3","readyState":"ERROR","url":"broken-app.vercel.app"}"#)
        .expect(1)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Broken App", TemplateId::Nextjs, NEXT_PAGE);
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.url, None);
    assert_eq!(result.error_kind.as_deref(), Some("ProviderAPIError"));
    assert!(result.error.unwrap().contains("ERROR"));

    let status = engine.get_deployment_status(&result.deployment_id).unwrap();
    assert_eq!(status.status, DeploymentState::Failed);
    poll.assert_async().await;
}

#[tokio::test]
async fn test_failing_build_command_stops_pipeline() {
    let mut server = mockito::Server::new_async().await;
    let vercel = server
        .mock("POST", "/v13/deployments")
        .expect(0)
        .create_async()
        .await;

    let executor = Arc::new(FailingExecutor::default());
    let engine = engine_builder(&server.url())
        .executor(executor.clone())
        .build()
        .unwrap();

    let fragment = Fragment::new("Hello App", TemplateId::Nextjs, NEXT_PAGE);
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("vercel"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.error_kind.as_deref(), Some("BuildError"));
    assert_eq!(result.url, None);
    assert_eq!(
        *executor.commands.lock().unwrap(),
        vec!["npm install".to_string()]
    );

    vercel.assert_async().await;
}

#[tokio::test]
async fn test_missing_credentials_fail_with_config_error() {
    let timeout = Duration::from_secs(5);
    let drivers = DriverRegistry::builtin(
        &ProviderEndpoints::uniform("http://127.0.0.1:9"),
        &Credentials::default(),
        timeout,
    )
    .unwrap();
    let engine = engine_builder("http://127.0.0.1:9")
        .drivers(drivers)
        .build()
        .unwrap();

    let fragment = Fragment::new("No Token", TemplateId::CodeInterpreter, "print('hi')\n");
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("fly-io"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.error_kind.as_deref(), Some("ConfigError"));
    assert_eq!(
        result.error.as_deref(),
        Some("Configuration error: FLY_TOKEN is not set")
    );
}

#[tokio::test]
async fn test_cancel_while_building() {
    let started = Arc::new(Notify::new());
    let engine = Arc::new(
        engine_builder("http://127.0.0.1:9")
            .executor(Arc::new(SlowExecutor {
                started: started.clone(),
                delay: Duration::from_millis(200),
            }))
            .build()
            .unwrap(),
    );

    let fragment = Fragment::new("Cancel Me", TemplateId::CodeInterpreter, "print('hi')\n");
    let (deployment_id, handle) =
        engine.spawn_deployment(fragment, DeploymentConfig::for_provider("render"));

    started.notified().await;
    assert!(engine.cancel_deployment(&deployment_id));

    let result = handle.await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Cancelled);
    assert_eq!(result.error_kind.as_deref(), Some("Cancelled"));
    assert_eq!(result.error.as_deref(), Some("Deployment cancelled by user"));

    // Nothing moves a cancelled deployment afterwards
    tokio::time::sleep(Duration::from_millis(50)).await;
    let status = engine.get_deployment_status(&deployment_id).unwrap();
    assert_eq!(status.status, DeploymentState::Cancelled);
    assert!(!engine.cancel_deployment(&deployment_id));
    assert!(!engine.rollback_deployment(&deployment_id));

    let history = engine.get_deployment_history("Cancel Me");
    assert_eq!(history[0].deployment_id, deployment_id);
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/services")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"srv-9","name":"progress"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/v1/services/srv-9/deploys")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dep-9"}"#)
        .create_async()
        .await;

    let engine = Arc::new(
        engine_builder(&server.url())
            .executor(Arc::new(SlowExecutor {
                started: Arc::new(Notify::new()),
                delay: Duration::from_millis(30),
            }))
            .build()
            .unwrap(),
    );

    let fragment = Fragment::new("Progress", TemplateId::CodeInterpreter, "print('hi')\n");
    let (deployment_id, handle) =
        engine.spawn_deployment(fragment, DeploymentConfig::for_provider("render"));

    let mut samples = Vec::new();
    while !handle.is_finished() {
        if let Some(status) = engine.get_deployment_status(&deployment_id) {
            samples.push(status.progress);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let result = handle.await.unwrap();
    samples.push(engine.get_deployment_status(&deployment_id).unwrap().progress);

    assert!(result.success, "{:?}", result.error);
    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{:?}", samples);
    assert_eq!(samples.last(), Some(&100));

    assert!(engine.rollback_deployment(&deployment_id));
    assert!(engine
        .get_deployment_status(&deployment_id)
        .unwrap()
        .logs
        .iter()
        .any(|l| l.contains("Rollback requested")));
    assert!(!engine.rollback_deployment("deploy_0_unknown"));
}

#[tokio::test]
async fn test_history_keeps_ten_newest() {
    let mut server = mockito::Server::new_async().await;
    let service = server
        .mock("POST", "/v1/services")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"srv-1","name":"dashboard"}"#)
        .expect(11)
        .create_async()
        .await;
    server
        .mock("POST", "/v1/services/srv-1/deploys")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dep-1"}"#)
        .create_async()
        .await;
    let engine = engine(&server.url());
    let fragment = Fragment::new("Dashboard", TemplateId::CodeInterpreter, "print('hi')\n");
    let config = DeploymentConfig::for_provider("render");

    let mut ids = Vec::new();
    for _ in 0..11 {
        let result = engine.deploy_fragment(&fragment, &config).await;
        assert!(result.success, "{:?}", result.error);
        ids.push(result.deployment_id);
    }

    let history = engine.get_deployment_history("Dashboard");
    assert_eq!(history.len(), 10);
    assert!(history.iter().all(|r| r.status == DeploymentState::Success));
    assert_eq!(history[0].deployment_id, ids[10]);
    assert_eq!(history[9].deployment_id, ids[1]);
    assert!(history.iter().all(|r| r.deployment_id != ids[0]));

    service.assert_async().await;
}
