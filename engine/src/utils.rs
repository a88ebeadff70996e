//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Generate a deployment id: `deploy_<unix millis>_<9 chars>`
pub fn generate_deployment_id() -> String {
    // simple() is 32 hex chars
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "deploy_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..9]
    )
}

/// Provider-safe name derived from a fragment title
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();

    if slug.is_empty() {
        "app".to_string()
    } else {
        slug
    }
}
