//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::deploy::DeploymentEngine;
use crate::errors::EngineError;
use crate::providers::Credentials;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the deployment engine behind its local HTTP server
pub async fn run(
    version: String,
    options: AppOptions,
    credentials: Credentials,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), EngineError> {
    info!("Initializing fragdeploy {}...", version);

    let engine = Arc::new(DeploymentEngine::from_options(&options.engine, &credentials)?);
    info!(
        "Deployment engine ready with providers: {}",
        engine
            .providers()
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let state = Arc::new(ServerState::new(engine));
    let handle = serve(&options.server, state, shutdown_signal).await?;

    let result = handle
        .await
        .map_err(|e| EngineError::Server(e.to_string()))?;
    if let Err(e) = &result {
        error!("HTTP server stopped with an error: {}", e);
    }

    info!("Shutdown complete");
    result
}
