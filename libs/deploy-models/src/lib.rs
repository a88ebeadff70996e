//! Deployment models
//!
//! Types shared between the deployment engine and whatever drives it
//! (the HTTP surface, the CLI, or an external UI).

pub mod api;
pub mod config;
pub mod deployment;
pub mod fragment;
pub mod provider;

pub use api::DeployRequest;
pub use config::{DeploymentConfig, Environment, Notifications, ProviderRef, ResourceLimits};
pub use deployment::{DeploymentResult, DeploymentState, DeploymentStatus};
pub use fragment::{Fragment, Language, TemplateId};
pub use provider::{BuildSettings, DeploymentProvider, PaidPlan, Pricing, ProviderKind};
