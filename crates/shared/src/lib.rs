//! Shared library for the VoirDrama addon workspace.
//!
//! This crate provides the pieces reused by the resolver pipeline and by any
//! server crate built on top of it:
//! - Configuration management
//! - Data models and id composition/parsing
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::{CacheConfig, CinemetaConfig, Config, LoggingConfig, UpstreamConfig};
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
