//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::options::{BuildMode, EngineOptions, ServerOptions};
use crate::deploy::deps::{DEFAULT_NPM_REGISTRY, DEFAULT_PYPI_REGISTRY};
use crate::deploy::registry::DEFAULT_HISTORY_CAPACITY;
use crate::errors::EngineError;
use crate::filesys::file::File;
use crate::logs::{LogLevel, LogOptions};
use crate::providers::poll::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::providers::{PollSettings, ProviderEndpoints};

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "fragdeploy.json";

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub poll: PollConfig,

    /// Results kept per fragment
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub registries: RegistrySettings,

    #[serde(default)]
    pub endpoints: ProviderEndpoints,

    #[serde(default)]
    pub build: BuildConfig,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            poll: PollConfig::default(),
            history_capacity: default_history_capacity(),
            http_timeout_secs: default_http_timeout(),
            registries: RegistrySettings::default(),
            endpoints: ProviderEndpoints::default(),
            build: BuildConfig::default(),
        }
    }
}

impl Settings {
    /// Read the settings file; a missing file means defaults
    pub async fn load(file: &File) -> Result<Self, EngineError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json().await.map_err(|e| {
            EngineError::Config(format!("{}: {}", file.path().display(), e))
        })
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            json_format: self.log_json,
            ..Default::default()
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        let build_mode = match self.build.mode {
            BuildModeSetting::Simulated => BuildMode::Simulated,
            BuildModeSetting::Shell => BuildMode::Shell {
                work_dir: self
                    .build
                    .work_dir
                    .clone()
                    .unwrap_or_else(|| std::env::temp_dir().join("fragdeploy-builds")),
            },
        };

        EngineOptions {
            poll: PollSettings {
                interval: Duration::from_millis(self.poll.interval_ms),
                max_attempts: self.poll.max_attempts,
            },
            history_capacity: self.history_capacity,
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            npm_registry: self.registries.npm.clone(),
            pypi_registry: self.registries.pypi.clone(),
            endpoints: self.endpoints.clone(),
            build_mode,
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Provider status polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_poll_attempts() -> u32 {
    DEFAULT_POLL_ATTEMPTS
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_poll_attempts(),
        }
    }
}

/// Package registries used for dependency checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    #[serde(default = "default_npm")]
    pub npm: String,

    #[serde(default = "default_pypi")]
    pub pypi: String,
}

fn default_npm() -> String {
    DEFAULT_NPM_REGISTRY.to_string()
}

fn default_pypi() -> String {
    DEFAULT_PYPI_REGISTRY.to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            npm: default_npm(),
            pypi: default_pypi(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildModeSetting {
    #[default]
    Simulated,
    Shell,
}

/// Build command execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    #[serde(default)]
    pub mode: BuildModeSetting,

    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}
