//! Logging configuration.
//!
//! Sources, later ones winning:
//! - `RUST_LOG` (passed through as filter directives)
//! - `UACAP_LOG` (a single level), `UACAP_LOG_FORMAT`, `UACAP_LOG_MATCHES`
//! - CLI flags (`-v`, `-q`, `--log-format`, `--no-color`)

use serde::{Deserialize, Serialize};

use super::events::event_names;

/// Targets that carry per-request matching decisions.
const MATCH_TARGETS: &[&str] = &[
    event_names::MATCH_RESOLVED,
    event_names::MATCH_CACHED,
    "ua_core::handlers",
];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" | "structured" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    /// Build and load milestones (default).
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Name as accepted by `EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" | "quiet" => Ok(LogLevel::Off),
            _ => Err(format!("unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Raw `RUST_LOG` directives; used instead of `level` when set.
    pub rust_log: Option<String>,
    /// Emit per-request matching decisions at debug whatever the level.
    pub trace_matching: bool,
    /// Whether ANSI colors may be used on a terminal.
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            rust_log: None,
            trace_matching: false,
            color: true,
        }
    }
}

impl LogConfig {
    /// Reads the environment, then applies CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        let mut config = LogConfig::default();

        match std::env::var("UACAP_LOG").ok().and_then(|v| v.parse().ok()) {
            Some(level) => config.level = level,
            None => {
                config.rust_log = std::env::var("RUST_LOG")
                    .ok()
                    .filter(|v| !v.trim().is_empty());
            }
        }
        if let Some(format) = std::env::var("UACAP_LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.format = format;
        }
        config.trace_matching = std::env::var("UACAP_LOG_MATCHES")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        if let Some(level) = cli_level {
            config.level = level;
            config.rust_log = None;
        }
        if let Some(format) = cli_format {
            config.format = format;
        }
        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self.rust_log = None;
        self
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    pub fn with_trace_matching(mut self, enabled: bool) -> Self {
        self.trace_matching = enabled;
        self
    }

    /// `EnvFilter` directives for this configuration.
    pub fn directives(&self) -> String {
        let mut directives = match &self.rust_log {
            Some(raw) => raw.trim().to_string(),
            None => self.level.as_str().to_string(),
        };
        if self.trace_matching {
            for target in MATCH_TARGETS {
                directives.push_str(&format!(",{target}=debug"));
            }
        }
        directives
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&'static str]) -> Self {
            let saved = keys.iter().map(|k| (*k, std::env::var(k).ok())).collect();
            for k in keys {
                std::env::remove_var(k);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (k, v) in &self.saved {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    const KEYS: &[&str] = &["UACAP_LOG", "RUST_LOG", "UACAP_LOG_FORMAT", "UACAP_LOG_MATCHES"];

    #[test]
    fn format_and_level_names() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("quiet".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogFormat::Jsonl.to_string(), "jsonl");
    }

    #[test]
    fn directives_follow_level_or_rust_log() {
        let config = LogConfig::default();
        assert_eq!(config.directives(), "info");

        let config = LogConfig {
            rust_log: Some("warn,ua_store=debug".to_string()),
            ..LogConfig::default()
        };
        assert_eq!(config.directives(), "warn,ua_store=debug");

        let config = config.with_level(LogLevel::Error);
        assert_eq!(config.directives(), "error");
    }

    #[test]
    fn match_tracing_adds_targets() {
        let directives = LogConfig::default()
            .with_level(LogLevel::Warn)
            .with_trace_matching(true)
            .directives();
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("match.resolved=debug"));
        assert!(directives.contains("ua_core::handlers=debug"));
    }

    #[test]
    fn env_then_cli_precedence() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(KEYS);

        std::env::set_var("RUST_LOG", "ua_core=debug");
        let config = LogConfig::from_env(None, None);
        assert_eq!(config.rust_log.as_deref(), Some("ua_core=debug"));

        std::env::set_var("UACAP_LOG", "error");
        std::env::set_var("UACAP_LOG_FORMAT", "jsonl");
        std::env::set_var("UACAP_LOG_MATCHES", "yes");
        let config = LogConfig::from_env(None, None);
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.rust_log, None);
        assert_eq!(config.format, LogFormat::Jsonl);
        assert!(config.trace_matching);

        let config = LogConfig::from_env(Some(LogLevel::Trace), Some(LogFormat::Human));
        assert_eq!(config.directives().split(',').next(), Some("trace"));
        assert_eq!(config.format, LogFormat::Human);
    }

    #[test]
    fn cli_level_discards_rust_log() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(KEYS);

        std::env::set_var("RUST_LOG", "trace");
        let config = LogConfig::from_env(Some(LogLevel::Error), None);
        assert_eq!(config.directives(), "error");
    }
}
