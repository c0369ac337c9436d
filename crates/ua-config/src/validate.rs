//! Configuration validation errors and semantic validation.

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use ua_store::Provider;

use crate::engine::EngineConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

/// Validate an engine configuration semantically.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    // A repository must come from somewhere: sources or a persisted build.
    match &config.database.main {
        Some(main) => validate_source_path("database.main", main, &["xml", "zip"])?,
        None if config.persistence.provider == Provider::Null => {
            return Err(ValidationError::MissingField("database.main".to_string()));
        }
        None => {}
    }

    for (idx, patch) in config.database.patches.iter().enumerate() {
        validate_source_path(&format!("database.patches[{}]", idx), patch, &["xml"])?;
    }

    if config.database.main.is_none() && !config.database.patches.is_empty() {
        return Err(ValidationError::SemanticError(
            "database.patches requires database.main".to_string(),
        ));
    }

    for (idx, name) in config.database.capability_filter.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("database.capability_filter[{}]", idx),
                message: "Must not be empty".to_string(),
            });
        }
    }

    if config.persistence.provider == Provider::File
        && config.persistence.effective_dir().is_none()
    {
        return Err(ValidationError::MissingField("persistence.dir".to_string()));
    }

    if config.cache.provider == Provider::File && config.cache.effective_dir().is_none() {
        return Err(ValidationError::MissingField("cache.dir".to_string()));
    }

    validate_header_precedence(&config.matching.header_precedence)?;

    Ok(())
}

fn validate_source_path(field: &str, path: &Path, extensions: &[&str]) -> ValidationResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "Must not be empty".to_string(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if extensions.contains(&ext.as_str()) => Ok(()),
        _ => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!(
                "Expected a .{} file, got {}",
                extensions.join(" or ."),
                path.display()
            ),
        }),
    }
}

fn validate_header_precedence(headers: &[String]) -> ValidationResult<()> {
    if headers.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "matching.header_precedence".to_string(),
            message: "Must list at least one header".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (idx, header) in headers.iter().enumerate() {
        let canonical = header.trim().to_ascii_lowercase().replace('_', "-");
        if canonical.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("matching.header_precedence[{}]", idx),
                message: "Must not be empty".to_string(),
            });
        }
        if !seen.insert(canonical) {
            return Err(ValidationError::SemanticError(format!(
                "Header '{}' is listed more than once in matching.header_precedence",
                header
            )));
        }
    }
    Ok(())
}
