//! Event levels, engine stages and standard event names.

use serde::{Deserialize, Serialize};

/// Log levels as written to JSONL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Phases of an engine invocation, recorded on spans as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration loading and store setup.
    Init,
    /// Parsing definitions and patches into a repository.
    Build,
    /// Loading a persisted repository.
    Load,
    /// Resolving user agents.
    Match,
    /// Cache and persistence maintenance.
    Store,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Build => "build",
            Stage::Load => "load",
            Stage::Match => "match",
            Stage::Store => "store",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard event names, used as the `target` of tracing events.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";

    pub const BUILD_STARTED: &str = "build.started";
    pub const BUILD_PATCH_APPLIED: &str = "build.patch_applied";
    pub const BUILD_FINISHED: &str = "build.finished";
    pub const BUILD_FAILED: &str = "build.failed";

    pub const REPOSITORY_LOADED: &str = "repository.loaded";
    pub const REPOSITORY_STALE: &str = "repository.stale";

    pub const STORE_DEGRADED: &str = "store.degraded";
    pub const CACHE_CLEARED: &str = "cache.cleared";

    pub const MATCH_RESOLVED: &str = "match.resolved";
    pub const MATCH_CACHED: &str = "match.cached";
}
