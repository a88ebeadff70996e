//! HTTP plumbing shared by provider drivers

pub mod client;
