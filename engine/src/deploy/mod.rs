//! Deployment pipeline

pub mod artifacts;
pub mod builder;
pub mod deps;
pub mod fsm;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod validator;

pub use orchestrator::{DeploymentEngine, EngineBuilder};
