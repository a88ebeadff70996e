//! HTTP API tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use fragdeploy::models::{DeployRequest, TemplateId};
use fragdeploy::server::serve::router;
use fragdeploy::server::state::ServerState;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::engine;

fn app() -> Router {
    let engine = Arc::new(engine("http://127.0.0.1:9"));
    router(Arc::new(ServerState::new(engine)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "fragdeploy");
}

#[tokio::test]
async fn test_providers_filtered_by_template() {
    let app = app();

    let (status, body) = send(&app, get("/providers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["providers"].as_array().unwrap().len(), 5);

    let (status, body) = send(&app, get("/providers?template=gradio-developer")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["providers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["railway", "render", "fly-io"]);

    let (status, _) = send(&app, get("/providers?template=flash-developer")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_deploy_is_queryable() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/deployments")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "fragment": { "title": "Empty", "template": "nextjs-developer", "code": "" },
                "config": { "provider": "vercel" }
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let id = body["deploymentId"].as_str().unwrap().to_string();
    let (status, body) = send(&app, get(&format!("/deployments/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    let (status, body) = send(&app, get("/deployments?fragment_id=Empty")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deployments"][0]["deploymentId"], id.as_str());

    // Only building deployments can be cancelled
    let cancel = Request::builder()
        .method("DELETE")
        .uri(format!("/deployments/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, cancel).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let rollback = Request::builder()
        .method("POST")
        .uri(format!("/deployments/{}/rollback", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, rollback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_deployment_is_not_found() {
    let app = app();

    let (status, _) = send(&app, get("/deployments/deploy_0_missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let cancel = Request::builder()
        .method("DELETE")
        .uri("/deployments/deploy_0_missing")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, cancel).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_requires_fragment_id() {
    let (status, body) = send(&app(), get("/deployments")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fragment_id"));
}

#[test]
fn test_deploy_request_waits_by_default() {
    let request: DeployRequest = serde_json::from_value(json!({
        "fragment": { "title": "Hello", "template": "vue-developer", "code": "<p>hi</p>" },
        "config": { "provider": "netlify" }
    }))
    .unwrap();
    assert!(request.wait);
    assert_eq!(request.fragment.template, TemplateId::Vue);
    assert_eq!(request.config.provider_id(), "netlify");
}
