//! Pre-flight validation of a fragment/config pair
//!
//! Runs before any network or filesystem access.

use std::sync::LazyLock;

use deploy_models::{DeploymentConfig, DeploymentProvider, Fragment};
use regex::Regex;

use crate::catalog::ProviderCatalog;
use crate::errors::EngineError;

static SENSITIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)password|secret|key|token|credential").expect("valid sensitive-name regex")
});

/// Minimum length of values held by sensitive-looking variables
pub const MIN_SECRET_LENGTH: usize = 8;

/// Validate a deployment request and resolve its provider
pub fn validate<'a>(
    fragment: &Fragment,
    config: &DeploymentConfig,
    catalog: &'a ProviderCatalog,
) -> Result<&'a DeploymentProvider, EngineError> {
    let provider = catalog.get(config.provider_id()).ok_or_else(|| {
        EngineError::Validation(format!(
            "Unsupported deployment provider: {}",
            config.provider_id()
        ))
    })?;

    if !provider.supports(fragment.template) {
        return Err(EngineError::Validation(format!(
            "Template {} is not supported by {}",
            fragment.template, provider.name
        )));
    }

    if fragment.code.trim().is_empty() {
        return Err(EngineError::Validation(
            "Fragment code is required for deployment".to_string(),
        ));
    }

    if fragment.title.trim().is_empty() {
        return Err(EngineError::Validation(
            "Fragment title is required for deployment".to_string(),
        ));
    }

    validate_environment_variables(config)?;

    Ok(provider)
}

/// Reject sensitive-looking variables with suspiciously short values
pub fn validate_environment_variables(config: &DeploymentConfig) -> Result<(), EngineError> {
    for (key, value) in &config.environment_variables {
        if SENSITIVE_NAME.is_match(key) && value.len() < MIN_SECRET_LENGTH {
            return Err(EngineError::Validation(format!(
                "Environment variable {} appears to be sensitive but is too short",
                key
            )));
        }
    }
    Ok(())
}
