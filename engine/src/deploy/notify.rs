//! Post-deployment notifications

use std::fmt;

use async_trait::async_trait;
use deploy_models::{DeploymentConfig, DeploymentResult};
use tracing::info;

use crate::errors::EngineError;

/// Where a deployment outcome is announced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationChannel {
    Email(Vec<String>),
    Slack(String),
    Discord(String),
    Webhook(String),
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Email(to) => write!(f, "email to {}", to.join(", ")),
            NotificationChannel::Slack(_) => f.write_str("Slack"),
            NotificationChannel::Discord(_) => f.write_str("Discord"),
            NotificationChannel::Webhook(url) => write!(f, "webhook {}", url),
        }
    }
}

/// Channels configured for a deployment, in a fixed order
pub fn channels(config: &DeploymentConfig) -> Vec<NotificationChannel> {
    let mut channels = Vec::new();

    if let Some(notifications) = &config.notifications {
        if !notifications.email.is_empty() {
            channels.push(NotificationChannel::Email(notifications.email.clone()));
        }
        if let Some(slack) = &notifications.slack {
            channels.push(NotificationChannel::Slack(slack.clone()));
        }
        if let Some(discord) = &notifications.discord {
            channels.push(NotificationChannel::Discord(discord.clone()));
        }
    }
    if let Some(url) = &config.webhook_url {
        channels.push(NotificationChannel::Webhook(url.clone()));
    }

    channels
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        channel: &NotificationChannel,
        result: &DeploymentResult,
    ) -> Result<(), EngineError>;
}

/// Announces deployments through the application log only
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        channel: &NotificationChannel,
        result: &DeploymentResult,
    ) -> Result<(), EngineError> {
        info!(
            "Notifying {}: deployment {} is live at {}",
            channel,
            result.deployment_id,
            result.url.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}
