//! Configuration system for the winrow editor.
//!
//! This crate provides configuration loading, saving, and default values
//! for the editor. It includes:
//!
//! - The [`Config`] struct and its serde defaults
//! - YAML persistence under `~/.config/winrow/config.yaml`
//! - Environment overrides (`tabstop`, `tabexpand`, `acmeshell`)
//! - Typed [`ConfigError`] values for callers that want to match on failures

pub mod config;
pub mod env_vars;
pub mod error;

pub use config::Config;
pub use error::ConfigError;
