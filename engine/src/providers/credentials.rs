//! Provider credentials
//!
//! Read from the environment only; tokens never appear in settings files,
//! logs or `Debug` output.

use secrecy::SecretString;

use crate::errors::EngineError;

pub const DEFAULT_FLY_ORG: &str = "personal";

/// API tokens and account identifiers of every provider
#[derive(Debug, Clone)]
pub struct Credentials {
    pub vercel_token: Option<SecretString>,
    pub netlify_token: Option<SecretString>,
    pub railway_token: Option<SecretString>,
    pub railway_project_id: Option<String>,
    pub railway_environment_id: Option<String>,
    pub render_token: Option<SecretString>,
    pub fly_token: Option<SecretString>,
    pub fly_org_slug: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            vercel_token: None,
            netlify_token: None,
            railway_token: None,
            railway_project_id: None,
            railway_environment_id: None,
            render_token: None,
            fly_token: None,
            fly_org_slug: DEFAULT_FLY_ORG.to_string(),
        }
    }
}

impl Credentials {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secret = |name: &str| var(name).map(SecretString::from);

        Self {
            vercel_token: secret("VERCEL_TOKEN"),
            netlify_token: secret("NETLIFY_TOKEN"),
            railway_token: secret("RAILWAY_TOKEN"),
            railway_project_id: var("RAILWAY_PROJECT_ID"),
            railway_environment_id: var("RAILWAY_ENVIRONMENT_ID"),
            render_token: secret("RENDER_TOKEN"),
            fly_token: secret("FLY_TOKEN"),
            fly_org_slug: var("FLY_ORG_SLUG").unwrap_or_else(|| DEFAULT_FLY_ORG.to_string()),
        }
    }

    /// Same token for every provider
    pub fn with_token(token: &str) -> Self {
        Self {
            vercel_token: Some(SecretString::from(token)),
            netlify_token: Some(SecretString::from(token)),
            railway_token: Some(SecretString::from(token)),
            render_token: Some(SecretString::from(token)),
            fly_token: Some(SecretString::from(token)),
            ..Self::default()
        }
    }
}

/// Unwrap a required credential
pub fn require<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T, EngineError> {
    value
        .as_ref()
        .ok_or_else(|| EngineError::Config(format!("{} is not set", name)))
}
