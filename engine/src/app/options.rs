//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::deps::{DEFAULT_NPM_REGISTRY, DEFAULT_PYPI_REGISTRY};
use crate::deploy::registry::DEFAULT_HISTORY_CAPACITY;
use crate::http::client::DEFAULT_TIMEOUT;
use crate::providers::{PollSettings, ProviderEndpoints};

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub engine: EngineOptions,
    pub server: ServerOptions,
}

/// Deployment engine options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Provider status polling
    pub poll: PollSettings,

    /// Results kept per fragment
    pub history_capacity: usize,

    /// Timeout of every outgoing HTTP request
    pub http_timeout: Duration,

    pub npm_registry: String,
    pub pypi_registry: String,

    pub endpoints: ProviderEndpoints,

    pub build_mode: BuildMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            http_timeout: DEFAULT_TIMEOUT,
            npm_registry: DEFAULT_NPM_REGISTRY.to_string(),
            pypi_registry: DEFAULT_PYPI_REGISTRY.to_string(),
            endpoints: ProviderEndpoints::default(),
            build_mode: BuildMode::default(),
        }
    }
}

/// How build commands are executed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Commands are logged as completed without running
    #[default]
    Simulated,

    /// Commands run through `sh -c` below `work_dir`
    Shell { work_dir: PathBuf },
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
