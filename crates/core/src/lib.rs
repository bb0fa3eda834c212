//! Shared types for the vigil alerting engine.
//!
//! This crate provides:
//! - `Level` — ordered alert severity (Ok < Warn < Error)
//! - `Script` — script model with header-comment metadata and file loading
//! - `Config` — YAML process configuration with validation
//! - `Datasource` — collaborator trait for named query backends

pub mod config;
pub mod datasource;
pub mod level;
pub mod script;

pub use config::{Config, ConfigError};
pub use datasource::{Datasource, DatasourceError};
pub use level::Level;
pub use script::{Script, ScriptError};
