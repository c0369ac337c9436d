//! Device capability engine configuration.
//!
//! This crate provides:
//! - Typed structs for the engine configuration file (TOML or JSON)
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation

pub mod engine;
pub mod resolve;
pub mod validate;

pub use engine::{
    CacheConfig, DatabaseConfig, EngineConfig, MatchMode, MatchingConfig, PersistenceConfig,
    DEFAULT_HEADER_PRECEDENCE,
};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use validate::{validate_config, ValidationError, ValidationResult};

use std::path::Path;

/// Application name used for XDG and system directories.
pub const APP_NAME: &str = "uacap";

/// Resolves the configuration file and loads it, or returns defaults when
/// no file is found anywhere along the resolution chain.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<(EngineConfig, ConfigPaths)> {
    let paths = resolve_config(cli_path)?;
    let config = match &paths.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    Ok((config, paths))
}
