//! Validation results shared by the configuration loader and the statement
//! grammar, plus validators for [`ControlPlaneConfig`].

use super::types::ControlPlaneConfig;
use std::fmt;

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path of the offending field or statement node.
    pub field: String,
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Severity of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may have issues.
    Warning,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ValidationSeverity::Error)
    }

    /// Get all validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get only errors (not warnings).
    #[must_use]
    pub fn errors_only(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Error)
            .collect()
    }

    /// Get only warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Warning)
            .collect()
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate a configuration and return any errors.
    fn validate(&self, config: &ControlPlaneConfig) -> ValidationResult;
}

/// Built-in validator for engine limits and retry budgets.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl BasicValidator {
    /// Create a new basic validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for BasicValidator {
    fn validate(&self, config: &ControlPlaneConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        let engine = &config.engine;

        if engine.web_acl_max_depth == 0 {
            result.add_error(ValidationError::error(
                "engine.web_acl_max_depth",
                "Web ACL depth must be at least 1",
            ));
        }
        if engine.rule_group_max_depth == 0 {
            result.add_error(ValidationError::error(
                "engine.rule_group_max_depth",
                "Rule group depth must be at least 1",
            ));
        }

        // Rule group roots must not be deeper than web ACL roots
        if engine.rule_group_max_depth > engine.web_acl_max_depth {
            result.add_error(ValidationError::error(
                "engine.rule_group_max_depth",
                format!(
                    "Rule group depth {} exceeds web ACL depth {}",
                    engine.rule_group_max_depth, engine.web_acl_max_depth
                ),
            ));
        } else if engine.rule_group_max_depth == engine.web_acl_max_depth {
            result.add_error(ValidationError::warning(
                "engine.rule_group_max_depth",
                "Rule group depth equals web ACL depth",
            ));
        }

        let retry = &config.retry;
        if retry.timeout_secs == 0 {
            result.add_error(ValidationError::error(
                "retry.timeout_secs",
                "Retry timeout cannot be 0",
            ));
        }
        if retry.associated_item_timeout_secs == 0 {
            result.add_error(ValidationError::error(
                "retry.associated_item_timeout_secs",
                "Associated item timeout cannot be 0",
            ));
        }
        if retry.initial_backoff_ms > retry.max_backoff_ms {
            result.add_error(ValidationError::error(
                "retry.initial_backoff_ms",
                "Initial backoff cannot exceed max backoff",
            ));
        }
        if retry.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::error(
                "retry.backoff_multiplier",
                "Backoff multiplier must be at least 1.0",
            ));
        }

        result
    }
}
