//! CLI output formats.
//!
//! Payloads go to stdout in the selected format; diagnostics always go to
//! stderr.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,

    /// Markdown report
    Md,

    /// One line per result, e.g. `nokia_3220_ver1 (nokia/conclusive)`
    Summary,

    /// Nothing on stdout; only the exit code
    Exitcode,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Md => "md",
            OutputFormat::Summary => "summary",
            OutputFormat::Exitcode => "exitcode",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_clap_values() {
        for format in OutputFormat::value_variants() {
            let parsed = OutputFormat::from_str(format.as_str(), true).unwrap();
            assert_eq!(parsed, *format);
        }
    }
}
