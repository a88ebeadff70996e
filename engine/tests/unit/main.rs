//! Integration tests for the deployment engine

mod common;
mod test_drivers;
mod test_engine;
mod test_fsm;
mod test_registry;
mod test_server;
