//! Unified error type for filter translation
//!
//! Every backend reports failures through [`FilterError`]. Errors are raised
//! eagerly while walking the filter tree; no translator returns partial output.

use thiserror::Error;

/// Unified error type for filter parsing and translation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Operator name absent from the catalog
    #[error("Unsupported operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// Operand has the wrong shape for its operator
    #[error("Invalid operand for '{operator}' on field '{field}': expected {expected}")]
    InvalidOperand {
        field: String,
        operator: String,
        expected: &'static str,
    },

    /// Operator mapping with zero or several operator keys, or mixed keys
    #[error("Malformed condition on field '{field}': {reason}")]
    MalformedCondition { field: String, reason: String },

    /// Field path that cannot be addressed safely
    #[error("Invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: &'static str },

    /// Input is not a filter at all
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Nesting deeper than the configured limit
    #[error("Filter nesting exceeds maximum depth of {max_depth}")]
    TooDeep { max_depth: usize },

    /// Raw JSON larger than the configured limit
    #[error("Filter JSON exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    /// Operator is valid but the target backend cannot express it
    #[error("Operator '{operator}' on field '{field}' is not supported by the {backend} backend")]
    UnsupportedByBackend {
        backend: &'static str,
        field: String,
        operator: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FilterError {
    /// Create an unsupported operator error
    pub fn unsupported_operator(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            field: field.into(),
            operator: operator.into(),
        }
    }

    /// Create an invalid operand error
    pub fn invalid_operand(
        field: impl Into<String>,
        operator: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidOperand {
            field: field.into(),
            operator: operator.into(),
            expected,
        }
    }

    /// Create a malformed condition error
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCondition {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid field path error
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidFieldPath {
            path: path.into(),
            reason,
        }
    }

    /// Create a backend capability error
    pub fn unsupported_by_backend(
        backend: &'static str,
        field: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self::UnsupportedByBackend {
            backend,
            field: field.into(),
            operator: operator.into(),
        }
    }

    /// Stable machine-readable code for surfacing the error to API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::InvalidOperand { .. } => "INVALID_OPERAND",
            Self::MalformedCondition { .. } => "MALFORMED_CONDITION",
            Self::InvalidFieldPath { .. } => "INVALID_FIELD_PATH",
            Self::InvalidFilter(_) => "INVALID_FILTER",
            Self::TooDeep { .. } => "FILTER_TOO_DEEP",
            Self::TooLarge { .. } => "FILTER_JSON_TOO_LARGE",
            Self::UnsupportedByBackend { .. } => "UNSUPPORTED_BY_BACKEND",
            Self::Config(_) => "INVALID_CONFIG",
        }
    }

    /// Whether the error was caused by the filter itself rather than by configuration
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_operator_names_field_and_operator() {
        let err = FilterError::unsupported_operator("age", "$bogus");
        assert_eq!(err.to_string(), "Unsupported operator '$bogus' on field 'age'");
        assert_eq!(err.code(), "UNSUPPORTED_OPERATOR");
    }

    #[test]
    fn invalid_operand_mentions_expected_shape() {
        let err = FilterError::invalid_operand("tags", "$in", "an array");
        assert_eq!(
            err.to_string(),
            "Invalid operand for '$in' on field 'tags': expected an array"
        );
    }

    #[test]
    fn backend_error_names_backend() {
        let err = FilterError::unsupported_by_backend("pinecone", "body", "$regex");
        assert!(err.to_string().contains("pinecone backend"));
        assert!(err.is_client_error());
    }

    #[test]
    fn config_error_is_not_client_error() {
        let err = FilterError::Config("bad".to_string());
        assert!(!err.is_client_error());
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}
