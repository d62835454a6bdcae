//! Uploader error types

use std::fmt;
use thiserror::Error;

use shared::{FailureKind, SharedError};

use crate::types::PlatformFailure;

/// Result type for uploader operations
pub type UploaderResult<T> = Result<T, UploaderError>;

/// One missing or malformed field of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: String,
    pub reason: String,
}

/// Every problem found while validating a row, not just the first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub problems: Vec<FieldProblem>,
}

impl ValidationError {
    pub fn push(&mut self, field: &str, reason: impl Into<String>) {
        self.problems.push(FieldProblem {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.problems.iter().any(|p| p.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .problems
            .iter()
            .map(|p| format!("{}: {}", p.field, p.reason))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Uploader error types
#[derive(Error, Debug)]
pub enum UploaderError {
    #[error("Invalid row: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown platform '{label}'")]
    UnknownPlatform { label: String },

    #[error("Planning failed: {reason}")]
    Planning { reason: String },

    #[error("Transient platform error: {0}")]
    TransientPlatform(PlatformFailure),

    #[error("Platform rejected request: {0}")]
    PermanentPlatform(PlatformFailure),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Spreadsheet error: {message}")]
    Sheet { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Thumbnail error: {message}")]
    Thumbnail { message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl UploaderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn planning(reason: impl Into<String>) -> Self {
        Self::Planning {
            reason: reason.into(),
        }
    }

    /// Failure kind recorded when this error ends a row or unit
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            UploaderError::Validation(_) => FailureKind::Validation,
            UploaderError::UnknownPlatform { .. } => FailureKind::UnknownPlatform,
            UploaderError::Planning { .. } => FailureKind::Planning,
            UploaderError::TransientPlatform(_) => FailureKind::Transient,
            _ => FailureKind::Permanent,
        }
    }
}

impl From<PlatformFailure> for UploaderError {
    fn from(failure: PlatformFailure) -> Self {
        if failure.is_transient() {
            UploaderError::TransientPlatform(failure)
        } else {
            UploaderError::PermanentPlatform(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureCategory;

    #[test]
    fn test_validation_error_lists_every_problem() {
        let mut error = ValidationError::default();
        error.push("Title", "must not be empty");
        error.push("Media Path", "no URLs found");

        assert_eq!(error.to_string(), "Title: must not be empty; Media Path: no URLs found");
        assert!(error.has_field("Title"));
        assert!(!error.has_field("Body"));
    }

    #[test]
    fn test_platform_failure_conversion() {
        let transient = PlatformFailure::new(FailureCategory::RateLimited, "slow down");
        let permanent = PlatformFailure::new(FailureCategory::PolicyRejected, "policy");

        assert!(matches!(UploaderError::from(transient), UploaderError::TransientPlatform(_)));
        let error = UploaderError::from(permanent);
        assert!(matches!(error, UploaderError::PermanentPlatform(_)));
        assert_eq!(error.failure_kind(), FailureKind::Permanent);
    }
}
