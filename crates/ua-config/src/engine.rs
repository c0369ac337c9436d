//! Engine configuration types.
//!
//! Every section and field has a serde default, so an empty document is a
//! valid configuration. Relative paths are resolved against the directory of
//! the file they were read from.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use ua_store::Provider;

use crate::validate::{ValidationError, ValidationResult};
use crate::APP_NAME;

/// Headers consulted for the effective user agent, highest priority first.
pub const DEFAULT_HEADER_PRECEDENCE: &[&str] = &[
    "x-device-user-agent",
    "x-original-user-agent",
    "x-skyfire-version",
    "x-bluecoat-via",
    "user-agent",
];

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub persistence: PersistenceConfig,
    pub cache: CacheConfig,
    pub matching: MatchingConfig,
}

/// Definition sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Base definition document (`.xml` or `.zip`).
    pub main: Option<PathBuf>,

    /// Patch documents, applied in order.
    pub patches: Vec<PathBuf>,

    /// Group and capability names to keep; empty keeps everything.
    pub capability_filter: Vec<String>,
}

/// Where the built repository is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceConfig {
    pub provider: Provider,
    pub dir: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            provider: Provider::File,
            dir: None,
        }
    }
}

impl PersistenceConfig {
    /// Configured directory, or `<cache dir>/uacap/repository`.
    pub fn effective_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join(APP_NAME).join("repository")))
    }
}

/// Memoization of user-agent lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub provider: Provider,
    pub dir: Option<PathBuf>,
    /// Entry lifetime in seconds; `0` means entries never expire.
    pub expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Memory,
            dir: None,
            expiration_secs: 3600,
        }
    }
}

impl CacheConfig {
    /// Configured directory, or `<cache dir>/uacap/lookups`.
    pub fn effective_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join(APP_NAME).join("lookups")))
    }
}

/// Matching behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub mode: MatchMode,
    pub header_precedence: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::default(),
            header_precedence: DEFAULT_HEADER_PRECEDENCE
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

/// Accuracy/performance trade-off applied by every matcher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Fuzzy comparison enabled; fewer false negatives.
    #[default]
    Accuracy,
    /// Exact and prefix comparison only.
    Performance,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Accuracy => "accuracy",
            MatchMode::Performance => "performance",
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineConfig {
    /// Loads a configuration file; `.json` is parsed as JSON, anything else
    /// as TOML. Relative paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };

        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> ValidationResult<Self> {
        toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> ValidationResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Rewrites every relative path as `base.join(path)`.
    pub fn resolve_relative_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(main) = self.database.main.as_mut() {
            rebase(main);
        }
        self.database.patches.iter_mut().for_each(rebase);
        if let Some(dir) = self.persistence.dir.as_mut() {
            rebase(dir);
        }
        if let Some(dir) = self.cache.dir.as_mut() {
            rebase(dir);
        }
    }

    /// Canonical TOML rendering, used by `ua-core info`.
    pub fn to_toml_string(&self) -> ValidationResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ValidationError::ParseError(format!("Cannot render TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.matching.mode, MatchMode::Accuracy);
        assert_eq!(config.cache.provider, Provider::Memory);
        assert_eq!(config.cache.expiration_secs, 3600);
        assert_eq!(config.persistence.provider, Provider::File);
        assert_eq!(
            config.matching.header_precedence.first().map(String::as_str),
            Some("x-device-user-agent")
        );
    }

    #[test]
    fn toml_sections_parse() {
        let config = EngineConfig::from_toml_str(
            r#"
            [database]
            main = "wurfl.xml"
            patches = ["a.xml", "b.xml"]
            capability_filter = ["product_info", "resolution_width"]

            [persistence]
            provider = "memory"

            [cache]
            provider = "null"
            expiration_secs = 0

            [matching]
            mode = "performance"
            header_precedence = ["user-agent"]
            "#,
        )
        .unwrap();

        assert_eq!(config.database.main, Some(PathBuf::from("wurfl.xml")));
        assert_eq!(config.database.patches.len(), 2);
        assert_eq!(config.persistence.provider, Provider::Memory);
        assert_eq!(config.cache.provider, Provider::Null);
        assert_eq!(config.cache.expiration_secs, 0);
        assert_eq!(config.matching.mode, MatchMode::Performance);
        assert_eq!(config.matching.header_precedence, vec!["user-agent"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_toml_str("[database]\nmian = \"x.xml\"\n").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{"matching": {"mode": "fast"}}"#).unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn relative_paths_are_rebased() {
        let mut config = EngineConfig::from_toml_str(
            "[database]\nmain = \"db/wurfl.xml\"\npatches = [\"/abs/p.xml\", \"p2.xml\"]\n[persistence]\ndir = \"store\"\n",
        )
        .unwrap();
        config.resolve_relative_paths(Path::new("/etc/uacap"));
        assert_eq!(
            config.database.main,
            Some(PathBuf::from("/etc/uacap/db/wurfl.xml"))
        );
        assert_eq!(
            config.database.patches,
            vec![PathBuf::from("/abs/p.xml"), PathBuf::from("/etc/uacap/p2.xml")]
        );
        assert_eq!(config.persistence.dir, Some(PathBuf::from("/etc/uacap/store")));
    }

    #[test]
    fn explicit_dir_wins_over_default() {
        let persistence = PersistenceConfig {
            provider: Provider::File,
            dir: Some(PathBuf::from("/tmp/x")),
        };
        assert_eq!(persistence.effective_dir(), Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn toml_rendering_parses_back() {
        let mut config = EngineConfig::default();
        config.database.main = Some(PathBuf::from("/data/wurfl.xml"));
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
