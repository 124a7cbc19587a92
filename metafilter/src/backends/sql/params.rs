//! Bound parameters and the translated SQL query

use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::utils::sql::count_placeholders;

/// Value bound to a `?` placeholder
///
/// Arrays and objects compared as whole documents are bound as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&JsonValue> for SqlValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
            },
            JsonValue::String(s) => SqlValue::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => SqlValue::Text(value.to_string()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

/// Collects SQL parameters during query building (maintains insertion order)
#[derive(Debug, Default)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    /// Record a value and return its placeholder
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> &'static str {
        self.values.push(value.into());
        "?"
    }
}

/// Parameterized SQL fragment with its bound values in placeholder order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl SqlQuery {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Number of `?` placeholders in `sql` (always equal to `values.len()`)
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    /// Bind the values, in order, to a SQLite query built from this SQL
    pub fn bind_sqlite<'q>(
        &self,
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for value in &self.values {
            query = match value {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Bool(b) => query.bind(*b),
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Real(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
            };
        }
        query
    }
}
