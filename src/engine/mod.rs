pub mod config;
pub mod error;
pub mod locator;
pub mod navigator;
pub mod orchestrator;
pub mod preflight;
pub mod resolver;
