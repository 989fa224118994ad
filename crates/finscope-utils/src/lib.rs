//! Shared utilities for finscope
//!
//! This crate provides common functionality used across the finscope workspace:
//! tracing setup and typed access to environment configuration.

pub mod config;
pub mod logging;

pub use config::{EnvError, env_duration_secs, env_or, env_parse};
pub use logging::{init_tracing, init_tracing_json};
