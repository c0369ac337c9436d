//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG paths →
//! system config → defaults.

use std::path::{Path, PathBuf};

use crate::validate::{ValidationError, ValidationResult};
use crate::APP_NAME;

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to the configuration file (or None if not found).
    pub config: Option<PathBuf>,

    /// Source of the configuration (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/uacap/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "UACAP_CONFIG";
pub const ENV_CONFIG_DIR: &str = "UACAP_CONFIG_DIR";

/// Standard config file names, in lookup order within a directory.
const CONFIG_FILENAMES: &[&str] = &["config.toml", "config.json"];

/// Resolve the configuration file path.
///
/// Resolution order:
/// 1. Explicit CLI path (must exist)
/// 2. UACAP_CONFIG environment variable
/// 3. UACAP_CONFIG_DIR environment variable + filename
/// 4. XDG config directory (~/.config/uacap/)
/// 5. System config (/etc/uacap/)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> ValidationResult<ConfigPaths> {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if !path.is_file() {
            return Err(ValidationError::IoError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(found(path.to_path_buf(), ConfigSource::CliArgument));
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Ok(found(path, ConfigSource::Environment));
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = find_in_dir(Path::new(&config_dir)) {
            return Ok(found(path, ConfigSource::Environment));
        }
    }

    // 4. XDG config directory
    if let Some(path) = xdg_config_dir().and_then(|d| find_in_dir(&d)) {
        return Ok(found(path, ConfigSource::XdgConfig));
    }

    // 5. System config
    if let Some(path) = find_in_dir(&system_config_dir()) {
        return Ok(found(path, ConfigSource::SystemConfig));
    }

    // 6. Built-in default (None)
    Ok(ConfigPaths::default())
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        config: Some(path),
        source,
    }
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Get the XDG config directory for uacap.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
