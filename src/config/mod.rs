//! Configuration loading and validation for herald.
//!
//! This module handles loading the YAML configuration file, validation,
//! and substitution of environment variables into service identifiers.

mod env;
mod secret;
mod types;

pub use env::resolve_env_vars;
pub use secret::SecretString;
pub use types::{AssetConfig, Config, DEFAULT_CONFIG_PATH, DefaultsConfig};
