//! Provider driver tests through the engine

use fragdeploy::models::{DeploymentConfig, DeploymentState, Fragment, TemplateId};
use mockito::Matcher;
use serde_json::json;

use crate::common::engine;

const PAGE: &str = "<template>\n  <h1>{{ msg }}</h1>\n</template>\n";

#[tokio::test]
async fn test_netlify_uploads_zip_and_polls() {
    let mut server = mockito::Server::new_async().await;
    let site = server
        .mock("POST", "/api/v1/sites")
        .match_body(Matcher::PartialJson(json!({ "name": "hello-vue" })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"site-1","name":"hello-vue"}"#)
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/api/v1/sites/site-1/deploys")
        .match_header("content-type", "application/zip")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"dep-1","state":"uploaded"}"#)
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/api/v1/deploys/dep-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":"dep-1","state":"ready","ssl_url":"https://hello-vue.netlify.app","deploy_ssl_url":"https://dep-1--hello-vue.netlify.app"}"#,
        )
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Hello Vue", TemplateId::Vue, PAGE);
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("netlify"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.url.as_deref(), Some("https://hello-vue.netlify.app"));
    assert_eq!(
        result.preview_url.as_deref(),
        Some("https://dep-1--hello-vue.netlify.app")
    );

    site.assert_async().await;
    upload.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn test_railway_graphql_errors_fail_the_deployment() {
    let mut server = mockito::Server::new_async().await;
    let graphql = server
        .mock("POST", "/graphql/v2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":null,"errors":[{"message":"Project not found"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Worker", TemplateId::CodeInterpreter, "print('hi')\n");
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("railway"))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, DeploymentState::Failed);
    assert_eq!(result.error_kind.as_deref(), Some("ProviderAPIError"));
    assert!(result.error.unwrap().contains("Project not found"));

    graphql.assert_async().await;
}

#[tokio::test]
async fn test_railway_service_and_deployment() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/graphql/v2")
        .match_body(Matcher::Regex("serviceCreate".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"serviceCreate":{"id":"svc-1","name":"worker"}}}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/graphql/v2")
        .match_body(Matcher::Regex("deploymentCreate".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"deploymentCreate":{"id":"rd-1","status":"SUCCESS","url":null}}}"#)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Worker", TemplateId::CodeInterpreter, "print('hi')\n");
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("railway"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.url.as_deref(), Some("https://worker.up.railway.app"));
    assert_eq!(result.metadata["deploymentId"], "rd-1");
}

#[tokio::test]
async fn test_fly_creates_app_then_deploys_image() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/pypi/gradio/json")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let app = server
        .mock("POST", "/v1/apps")
        .match_body(Matcher::PartialJson(json!({ "org_slug": "personal" })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"edge-app"}"#)
        .create_async()
        .await;
    let deploy = server
        .mock("POST", "/v1/apps/edge-app/deploy")
        .match_body(Matcher::PartialJson(json!({
            "image": "registry.fly.io/edge-app:latest",
            "config": { "services": [{ "internal_port": 7860 }] }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"m-1"}"#)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new(
        "Edge App",
        TemplateId::Gradio,
        "import gradio as gr\n\ndemo = gr.Interface(fn=str.upper, inputs='text', outputs='text')\n",
    );
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("fly-io"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.url.as_deref(), Some("https://edge-app.fly.dev"));
    assert_eq!(result.metadata["appName"], "edge-app");

    app.assert_async().await;
    deploy.assert_async().await;
}

#[tokio::test]
async fn test_provider_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/services")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"internal failure"}"#)
        .create_async()
        .await;
    let engine = engine(&server.url());

    let fragment = Fragment::new("Broken Service", TemplateId::CodeInterpreter, "print('hi')\n");
    let result = engine
        .deploy_fragment(&fragment, &DeploymentConfig::for_provider("render"))
        .await;

    assert_eq!(result.error_kind.as_deref(), Some("ProviderAPIError"));
    assert_eq!(
        result.error.as_deref(),
        Some("Render API error (500): internal failure")
    );
}
