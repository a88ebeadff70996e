//! Shared fixtures

use std::sync::Arc;
use std::time::Duration;

use fragdeploy::deploy::deps::HttpPackageIndex;
use fragdeploy::deploy::{DeploymentEngine, EngineBuilder};
use fragdeploy::providers::{Credentials, DriverRegistry, PollSettings, ProviderEndpoints};

pub const TOKEN: &str = "test-token";

pub fn fast_poll(max_attempts: u32) -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        max_attempts,
    }
}

pub fn credentials() -> Credentials {
    let mut credentials = Credentials::with_token(TOKEN);
    credentials.railway_project_id = Some("proj-1".to_string());
    credentials
}

/// Engine whose registries and providers all live at `base_url`
pub fn engine_builder(base_url: &str) -> EngineBuilder {
    let timeout = Duration::from_secs(5);
    let index = HttpPackageIndex::new(base_url, base_url, timeout).unwrap();
    let drivers =
        DriverRegistry::builtin(&ProviderEndpoints::uniform(base_url), &credentials(), timeout)
            .unwrap();

    DeploymentEngine::builder()
        .package_index(Arc::new(index))
        .drivers(drivers)
        .poll(fast_poll(3))
}

pub fn engine(base_url: &str) -> DeploymentEngine {
    engine_builder(base_url).build().unwrap()
}
