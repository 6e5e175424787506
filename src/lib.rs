// Core modules
pub mod api;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use api::{Gateway, GatewayError};
pub use models::*;
pub use strategy::Strategy;
