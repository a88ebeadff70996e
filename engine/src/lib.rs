//! fragdeploy library
//!
//! Validates, builds and ships generated code fragments to hosting providers.

pub mod app;
pub mod catalog;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod providers;
pub mod server;
pub mod storage;
pub mod utils;

pub use deploy_models as models;
