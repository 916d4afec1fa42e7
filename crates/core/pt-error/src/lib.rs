//! Error types for the partition topology planner.
//!
//! This crate provides:
//! - [`PtError`] - Top-level error enum for all planner errors
//! - Domain-specific errors ([`TemplateError`], [`CatalogError`], [`ExecutionError`])
//! - [`ErrorCategory`] for telling caller misuse apart from collaborator failures
//!
//! Catalog irregularities such as unparseable boundaries, gaps or overlaps are
//! never errors; they are reported as data by the inspection crate.

use thiserror::Error;

/// Top-level error type for the planner.
#[derive(Error, Debug)]
pub enum PtError {
    /// Required setup missing or contradictory (caller misuse)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template lookup or expansion errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Errors reported by a catalog reader
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Errors reported by an executor
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Template-related errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No template registered under the name
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template lacks a field its strategy needs
    #[error("Template '{template}' is incomplete: {reason}")]
    Incomplete { template: String, reason: String },

    /// Template file could not be read or decoded
    #[error("Failed to load templates: {0}")]
    Load(String),
}

/// Catalog-related errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to reach the catalog
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Catalog query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Table exists but is not partitioned
    #[error("Table is not partitioned: {0}")]
    NotPartitioned(String),

    /// Boundary expression outside the supported grammar
    #[error("Unrecognized boundary expression: {0}")]
    UnrecognizedBoundary(String),
}

/// Execution-related errors.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A single DDL statement failed
    #[error("Statement failed: {statement}: {message}")]
    Statement { statement: String, message: String },

    /// The surrounding transaction was rolled back
    #[error("Transaction rolled back: {0}")]
    RolledBack(String),

    /// Target relation already exists
    #[error("Relation already exists: {0}")]
    AlreadyExists(String),

    /// Target relation does not exist
    #[error("Relation not found: {0}")]
    NotFound(String),
}

/// Where an error originated.
///
/// Only [`ErrorCategory::Misuse`] is raised by the planner itself. The other
/// categories pass through from collaborators untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied incomplete or contradictory configuration
    Misuse,

    /// Catalog reader failed
    Catalog,

    /// Executor failed
    Execution,

    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Misuse => write!(f, "Misuse"),
            Self::Catalog => write!(f, "Catalog"),
            Self::Execution => write!(f, "Execution"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

impl PtError {
    /// Classifies this error by origin.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PtError::Config(_) | PtError::Template(_) => ErrorCategory::Misuse,
            PtError::Catalog(_) => ErrorCategory::Catalog,
            PtError::Execution(_) => ErrorCategory::Execution,
            PtError::Other(_) => ErrorCategory::Unknown,
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        PtError::Config(message.into())
    }
}

/// Result type alias using PtError.
pub type Result<T> = std::result::Result<T, PtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_misuse() {
        let error = PtError::config("no partition column set");
        assert_eq!(error.category(), ErrorCategory::Misuse);
        assert!(error.to_string().contains("no partition column"));
    }

    #[test]
    fn test_template_error_is_misuse() {
        let error = PtError::Template(TemplateError::NotFound("monthly_logs".to_string()));
        assert_eq!(error.category(), ErrorCategory::Misuse);
        assert!(error.to_string().contains("monthly_logs"));
    }

    #[test]
    fn test_execution_error_display() {
        let error = PtError::Execution(ExecutionError::Statement {
            statement: "DROP TABLE t_m2022_01".to_string(),
            message: "lock timeout".to_string(),
        });
        assert_eq!(error.category(), ErrorCategory::Execution);
        assert!(error.to_string().contains("DROP TABLE t_m2022_01"));
        assert!(error.to_string().contains("lock timeout"));
    }

    #[test]
    fn test_catalog_error_from() {
        let error: PtError = CatalogError::NotPartitioned("events".to_string()).into();
        assert_eq!(error.category(), ErrorCategory::Catalog);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Misuse.to_string(), "Misuse");
        assert_eq!(ErrorCategory::Execution.to_string(), "Execution");
    }
}
