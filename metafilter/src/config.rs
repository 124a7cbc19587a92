use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILTER_BYTES, DEFAULT_MAX_SEQUENCE_LEN, DEFAULT_METADATA_COLUMN,
};
use crate::error::FilterError;
use crate::utils::sql::is_valid_column_reference;

// =============================================================================
// Unsupported Operator Policy
// =============================================================================

/// What a native backend does with an operator it cannot express
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Fail the whole translation
    #[default]
    Reject,
    /// Omit the clause and log a warning
    Drop,
}

impl fmt::Display for UnsupportedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedPolicy::Reject => write!(f, "reject"),
            UnsupportedPolicy::Drop => write!(f, "drop"),
        }
    }
}

// =============================================================================
// Backend Sections
// =============================================================================

/// SQL backend settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlConfig {
    /// JSON column holding record metadata (`metadata` or `table.metadata`)
    pub metadata_column: String,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            metadata_column: DEFAULT_METADATA_COLUMN.to_string(),
        }
    }
}

/// Qdrant-style backend settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Prefix prepended to every payload key, e.g. `metadata`
    pub key_prefix: Option<String>,
    pub unsupported: UnsupportedPolicy,
}

// =============================================================================
// Translator Config
// =============================================================================

/// Settings shared by the parser and every translator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub max_depth: usize,
    pub max_filter_bytes: usize,
    pub max_sequence_len: usize,
    /// Rewrite RFC 3339 strings to canonical UTC ISO-8601
    pub normalize_dates: bool,
    pub sql: SqlConfig,
    pub qdrant: QdrantConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_filter_bytes: DEFAULT_MAX_FILTER_BYTES,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
            normalize_dates: true,
            sql: SqlConfig::default(),
            qdrant: QdrantConfig::default(),
        }
    }
}

impl TranslatorConfig {
    /// Parse configuration from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, FilterError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FilterError::Config(format!("Failed to parse config: {}", e)))?;
        tracing::trace!(config = ?config, "Parsed translator config");
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.max_depth == 0 {
            return Err(FilterError::Config(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        if self.max_filter_bytes == 0 {
            return Err(FilterError::Config(
                "max_filter_bytes must be greater than 0".to_string(),
            ));
        }
        if self.max_sequence_len == 0 {
            return Err(FilterError::Config(
                "max_sequence_len must be greater than 0".to_string(),
            ));
        }
        if !is_valid_column_reference(&self.sql.metadata_column) {
            return Err(FilterError::Config(format!(
                "sql.metadata_column '{}' is not a valid column reference",
                self.sql.metadata_column
            )));
        }
        if let Some(prefix) = &self.qdrant.key_prefix
            && (prefix.is_empty() || prefix.starts_with('.') || prefix.ends_with('.'))
        {
            return Err(FilterError::Config(format!(
                "qdrant.key_prefix '{}' must be a non-empty dotted key",
                prefix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TranslatorConfig::default();
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.max_filter_bytes, 64 * 1024);
        assert!(config.normalize_dates);
        assert_eq!(config.sql.metadata_column, "metadata");
        assert_eq!(config.qdrant.unsupported, UnsupportedPolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_partial() {
        let config = TranslatorConfig::from_json_str(
            r#"{"max_depth": 8, "qdrant": {"unsupported": "drop"}}"#,
        )
        .unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.qdrant.unsupported, UnsupportedPolicy::Drop);
        assert_eq!(config.qdrant.key_prefix, None);
        assert_eq!(config.sql.metadata_column, "metadata");
    }

    #[test]
    fn test_config_parse_empty() {
        let config = TranslatorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TranslatorConfig::default());
    }

    #[test]
    fn test_config_rejects_zero_depth() {
        let result = TranslatorConfig::from_json_str(r#"{"max_depth": 0}"#);
        assert!(matches!(result, Err(FilterError::Config(_))));
    }

    #[test]
    fn test_config_rejects_injected_column() {
        let result =
            TranslatorConfig::from_json_str(r#"{"sql": {"metadata_column": "metadata; DROP"}}"#);
        assert!(matches!(result, Err(FilterError::Config(_))));
    }

    #[test]
    fn test_config_accepts_qualified_column() {
        let config =
            TranslatorConfig::from_json_str(r#"{"sql": {"metadata_column": "docs.meta"}}"#)
                .unwrap();
        assert_eq!(config.sql.metadata_column, "docs.meta");
    }

    #[test]
    fn test_config_rejects_bad_key_prefix() {
        let result = TranslatorConfig::from_json_str(r#"{"qdrant": {"key_prefix": "meta."}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_invalid_json() {
        let result = TranslatorConfig::from_json_str("not json");
        assert!(matches!(result, Err(FilterError::Config(_))));
    }

    #[test]
    fn test_unsupported_policy_display() {
        assert_eq!(UnsupportedPolicy::Reject.to_string(), "reject");
        assert_eq!(UnsupportedPolicy::Drop.to_string(), "drop");
    }
}
