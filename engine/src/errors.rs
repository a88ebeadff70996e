//! Error types for the deployment engine

use thiserror::Error;

/// Main error type for the deployment engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dependency {package} is not available on {registry}")]
    Dependency { package: String, registry: String },

    #[error("Build error: {0}")]
    Build(String),

    #[error("{provider} API error ({status}): {message}")]
    ProviderApi {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} deployment timeout after {attempts} status checks")]
    Timeout { provider: String, attempts: u32 },

    #[error("Deployment cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Taxonomy name reported in deployment results
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "ValidationError",
            EngineError::Dependency { .. } => "DependencyError",
            EngineError::Build(_) => "BuildError",
            EngineError::ProviderApi { .. } => "ProviderAPIError",
            EngineError::Timeout { .. } => "TimeoutError",
            EngineError::Cancelled => "Cancelled",
            EngineError::Config(_) => "ConfigError",
            EngineError::Server(_) => "ServerError",
            EngineError::Io(_) => "IoError",
            EngineError::Json(_) => "JsonError",
            EngineError::Http(_) => "HttpError",
            EngineError::Internal(_) => "InternalError",
        }
    }
}

impl From<zip::result::ZipError> for EngineError {
    fn from(err: zip::result::ZipError) -> Self {
        EngineError::Internal(format!("zip archive: {}", err))
    }
}
