//! Core types and configuration for runway.
//!
//! This crate turns the loosely-typed plugin environment ([`PluginEnv`])
//! into a validated deployment request ([`Configuration`]), and defines the
//! resolution errors.

pub mod config;
pub mod env;
pub mod error;

pub use config::{Action, Configuration, DEFAULT_RUNTIME, ENV_SECRET_PREFIX, project_from_token};
pub use env::PluginEnv;
pub use error::{ConfigError, Result};
