//! Backend-independent translation helpers
//!
//! Every backend implements [`FilterTranslator`]. The helpers here are shared
//! rewrites that run before backend-specific lowering: value normalization and
//! simulation of `$all` for backends without a native "contains all".

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use super::operators::Operator;
use super::parser::parse_filter;
use super::types::{Condition, FieldPath, Filter, LogicalOp};
use crate::config::TranslatorConfig;
use crate::error::FilterError;
use crate::utils::time::{datetime_to_iso, normalize_iso_timestamp};

/// A backend-specific lowering of [`Filter`]
///
/// Translators are immutable after construction and hold no per-call state,
/// so one instance can be shared across threads.
pub trait FilterTranslator: Send + Sync {
    type Output;

    /// Short backend name used in errors and logs
    fn backend(&self) -> &'static str;

    fn config(&self) -> &TranslatorConfig;

    /// Whether the backend can express `operator`
    fn supports(&self, operator: Operator) -> bool;

    fn translate(&self, filter: &Filter) -> Result<Self::Output, FilterError>;

    /// Parse raw JSON with this translator's limits, then translate it
    fn translate_json(&self, value: &JsonValue) -> Result<Self::Output, FilterError> {
        let filter = parse_filter(value, self.config())?;
        self.translate(&filter)
    }

    /// Fail with a backend error when `operator` is not supported
    fn ensure_supported(&self, field: &str, operator: Operator) -> Result<(), FilterError> {
        if self.supports(operator) {
            Ok(())
        } else {
            Err(FilterError::unsupported_by_backend(
                self.backend(),
                field,
                operator.as_str(),
            ))
        }
    }

    /// Fail fast on filters nested deeper than the configured limit
    fn ensure_depth(&self, filter: &Filter) -> Result<(), FilterError> {
        let max_depth = self.config().max_depth;
        if filter.exceeds_depth(max_depth) {
            return Err(FilterError::TooDeep { max_depth });
        }
        Ok(())
    }
}

/// Normalize a value before it is handed to a backend
///
/// RFC 3339 strings become canonical UTC ISO-8601; arrays and objects are
/// normalized element-wise; every other value passes through unchanged.
pub fn normalize_value(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => match normalize_iso_timestamp(&s) {
            Some(iso) => JsonValue::String(iso),
            None => JsonValue::String(s),
        },
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(normalize_value).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize_value(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Canonical filter value for a typed timestamp
pub fn datetime_value(dt: &DateTime<Utc>) -> JsonValue {
    JsonValue::String(datetime_to_iso(dt))
}

/// Rewrite `{ path: { $all: values } }` as a conjunction of equalities
///
/// An empty `values` list yields `{ path: { $in: [] } }`, which matches nothing.
pub fn simulate_all(path: &FieldPath, values: &[JsonValue]) -> Filter {
    if values.is_empty() {
        return Filter::field(path.clone(), Condition::In(Vec::new()));
    }
    Filter::logical(
        LogicalOp::And,
        values
            .iter()
            .map(|value| Filter::field(path.clone(), Condition::Eq(value.clone())))
            .collect(),
    )
}
