//! SQL backend
//!
//! Translates filters into a parameterized SQLite predicate over a JSON
//! metadata column:
//!
//! ```
//! use metafilter::backends::sql::{SqlTranslator, SqlValue};
//! use metafilter::filters::FilterTranslator;
//! use serde_json::json;
//!
//! let translator = SqlTranslator::default();
//! let query = translator.translate_json(&json!({"status": "active"})).unwrap();
//! assert_eq!(query.sql, r#"json_extract(metadata, '$."status"') = ?"#);
//! assert_eq!(query.values, vec![SqlValue::from("active")]);
//! ```
//!
//! `$regex` lowers to `REGEXP`, which stock SQLite does not define. Open the
//! pool with [`sqlite_connect_options`] (or call `with_regexp()` on your own
//! `SqliteConnectOptions`) before running translated queries.

mod builder;
mod params;

pub use builder::json_path;
pub use params::{SqlParams, SqlQuery, SqlValue};

use std::str::FromStr;

use builder::{Scope, build_filter};
use sqlx::sqlite::SqliteConnectOptions;

use crate::config::TranslatorConfig;
use crate::constants::BACKEND_SQL;
use crate::error::FilterError;
use crate::filters::{Filter, FilterTranslator, Operator};

/// Connect options for `url` with the `REGEXP` function registered
pub fn sqlite_connect_options(url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(url)?.with_regexp())
}

/// Filter translator producing SQLite `WHERE` predicates
#[derive(Debug, Clone, Default)]
pub struct SqlTranslator {
    config: TranslatorConfig,
}

impl SqlTranslator {
    pub fn new(config: TranslatorConfig) -> Result<Self, FilterError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build a `WHERE ...` clause, or empty SQL when there is nothing to filter
    pub fn build_filter_query(&self, filter: Option<&Filter>) -> Result<SqlQuery, FilterError> {
        let Some(filter) = filter.filter(|f| !f.is_empty()) else {
            return Ok(SqlQuery::default());
        };
        let predicate = self.translate(filter)?;
        Ok(SqlQuery {
            sql: format!("WHERE {}", predicate.sql),
            values: predicate.values,
        })
    }
}

impl FilterTranslator for SqlTranslator {
    type Output = SqlQuery;

    fn backend(&self) -> &'static str {
        BACKEND_SQL
    }

    fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn supports(&self, operator: Operator) -> bool {
        !matches!(operator, Operator::Options)
    }

    /// Bare predicate; an empty filter gives empty SQL
    fn translate(&self, filter: &Filter) -> Result<SqlQuery, FilterError> {
        self.ensure_depth(filter)?;
        if filter.is_empty() {
            return Ok(SqlQuery::default());
        }

        let mut params = SqlParams::default();
        let scope = Scope::root(&self.config.sql.metadata_column);
        let sql = build_filter(filter, &scope, &mut params)?;

        tracing::debug!(
            backend = BACKEND_SQL,
            clauses = filter.len(),
            values = params.values.len(),
            "Translated filter"
        );

        Ok(SqlQuery {
            sql,
            values: params.values,
        })
    }
}
