//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deploy_models::api::{
    ControlResponse, DeployAccepted, DeployRequest, ErrorResponse, HealthResponse,
    HistoryResponse, ProviderListResponse, VersionResponse,
};
use deploy_models::TemplateId;
use serde::Deserialize;

use crate::server::state::ServerState;
use crate::utils::version_info;

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "fragdeploy".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

#[derive(Debug, Deserialize)]
pub struct ProvidersQuery {
    pub template: Option<String>,
}

/// Provider catalog, optionally restricted to one template
pub async fn providers_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ProvidersQuery>,
) -> Response {
    let catalog = state.engine.catalog();

    let providers = match query.template {
        Some(template) => match template.parse::<TemplateId>() {
            Ok(template) => catalog.supporting(template).into_iter().cloned().collect(),
            Err(e) => return error(StatusCode::BAD_REQUEST, e),
        },
        None => catalog.all().to_vec(),
    };

    Json(ProviderListResponse { providers }).into_response()
}

/// Start a deployment; waits for the result unless `wait` is false
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<DeployRequest>,
) -> Response {
    if request.wait {
        let result = state
            .engine
            .deploy_fragment(&request.fragment, &request.config)
            .await;
        return Json(result).into_response();
    }

    let (deployment_id, _handle) = state
        .engine
        .spawn_deployment(request.fragment, request.config);
    (StatusCode::ACCEPTED, Json(DeployAccepted { deployment_id })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub fragment_id: Option<String>,
}

/// Deployment history of one fragment
pub async fn history_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(fragment_id) = query.fragment_id.filter(|f| !f.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "fragment_id is required");
    };

    Json(HistoryResponse {
        deployments: state.engine.get_deployment_history(&fragment_id),
    })
    .into_response()
}

/// Live status of one deployment
pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.get_deployment_status(&id) {
        Some(status) => Json(status).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("Deployment {} not found", id)),
    }
}

fn control(success: bool, message: String) -> Response {
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(ControlResponse { success, message })).into_response()
}

/// Cancel a building deployment
pub async fn cancel_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    if state.engine.get_deployment_status(&id).is_none() {
        return error(StatusCode::NOT_FOUND, format!("Deployment {} not found", id));
    }

    if state.engine.cancel_deployment(&id) {
        control(true, format!("Deployment {} cancelled", id))
    } else {
        control(false, format!("Deployment {} is not building", id))
    }
}

/// Request a rollback of a successful deployment
pub async fn rollback_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Response {
    if state.engine.get_deployment_status(&id).is_none() {
        return error(StatusCode::NOT_FOUND, format!("Deployment {} not found", id));
    }

    if state.engine.rollback_deployment(&id) {
        control(true, format!("Rollback of {} requested", id))
    } else {
        control(false, format!("Deployment {} has not succeeded", id))
    }
}
