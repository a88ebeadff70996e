//! Status polling for submit-then-poll providers

use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::providers::{PollOutcome, ProviderDriver, ProviderHandle, ProviderOutcome};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

/// Poll `handle` until the provider reports a terminal state.
///
/// Every poll, answered or not, spends one attempt. A provider error response
/// is logged and polling goes on; any other error aborts. Submission is never
/// retried. `on_state` sees every non-terminal state reported.
pub async fn wait_for_terminal(
    driver: &dyn ProviderDriver,
    handle: &ProviderHandle,
    settings: PollSettings,
    mut on_state: impl FnMut(&str) + Send,
) -> Result<ProviderOutcome, EngineError> {
    for attempt in 1..=settings.max_attempts {
        match driver.poll(handle).await {
            Ok(PollOutcome::Terminal(outcome)) => {
                debug!(
                    "{} deployment {} reached {} after {} polls",
                    driver.provider_id(),
                    handle.id,
                    outcome.state,
                    attempt
                );
                return Ok(outcome);
            }
            Ok(PollOutcome::InProgress(state)) => on_state(&state),
            Err(e @ EngineError::ProviderApi { .. }) => {
                warn!(
                    "Status check {}/{} of {} failed: {}",
                    attempt,
                    settings.max_attempts,
                    handle.id,
                    e
                );
            }
            Err(e) => return Err(e),
        }

        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.interval).await;
        }
    }

    Err(EngineError::Timeout {
        provider: driver.provider_id().to_string(),
        attempts: settings.max_attempts,
    })
}
