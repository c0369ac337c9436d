//! Capability value typing.
//!
//! Definition documents store every value as a string. A capability's type
//! is inferred from all values it takes across the repository: it stays
//! `Int`, `Float` or `Bool` only while every value parses as that type, and
//! degrades to `String` otherwise.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityType {
    Int,
    Float,
    Bool,
    String,
}

impl CapabilityType {
    /// Type of a single value, preferring the narrowest.
    pub fn of(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.parse::<i64>().is_ok() {
            CapabilityType::Int
        } else if trimmed.parse::<f64>().is_ok() {
            CapabilityType::Float
        } else if is_bool(trimmed) {
            CapabilityType::Bool
        } else {
            CapabilityType::String
        }
    }

    /// Type after observing one more value.
    ///
    /// Integers never widen to floats; a mixed capability becomes a string.
    pub fn observe(self, value: &str) -> Self {
        let trimmed = value.trim();
        let fits = match self {
            CapabilityType::String => true,
            CapabilityType::Int => trimmed.parse::<i64>().is_ok(),
            CapabilityType::Float => trimmed.parse::<f64>().is_ok(),
            CapabilityType::Bool => is_bool(trimmed),
        };
        if fits {
            self
        } else {
            CapabilityType::String
        }
    }

    /// Converts a raw value; values that do not fit fall back to a string.
    pub fn convert(self, value: &str) -> CapabilityValue {
        let trimmed = value.trim();
        match self {
            CapabilityType::Int => trimmed
                .parse()
                .map(CapabilityValue::Int)
                .unwrap_or_else(|_| CapabilityValue::String(value.to_string())),
            CapabilityType::Float => trimmed
                .parse()
                .map(CapabilityValue::Float)
                .unwrap_or_else(|_| CapabilityValue::String(value.to_string())),
            CapabilityType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => CapabilityValue::Bool(true),
                "false" => CapabilityValue::Bool(false),
                _ => CapabilityValue::String(value.to_string()),
            },
            CapabilityType::String => CapabilityValue::String(value.to_string()),
        }
    }
}

fn is_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
}

/// A capability value with its inferred type applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl std::fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityValue::Int(v) => write!(f, "{}", v),
            CapabilityValue::Float(v) => write!(f, "{}", v),
            CapabilityValue::Bool(v) => write!(f, "{}", v),
            CapabilityValue::String(v) => f.write_str(v),
        }
    }
}
