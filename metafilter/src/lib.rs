//! Cross-backend metadata filter translation
//!
//! Translates one MongoDB/Sift-style filter language into the native query
//! form of several storage backends:
//! - `filters` - Operator catalog, parsed filter tree and shared rewrites
//! - `backends::sql` - Parameterized SQLite predicates over a JSON column
//! - `backends::pinecone` - Pinecone metadata filters
//! - `backends::qdrant` - Qdrant `must`/`should`/`must_not` filters
//! - `config` - Parser limits and backend settings
//! - `error` - Unified error type
//!
//! ## Usage
//!
//! ```
//! use metafilter::{FilterTranslator, QdrantTranslator, SqlTranslator};
//! use serde_json::json;
//!
//! let filter = json!({"$or": [{"tier": "gold"}, {"score": {"$gt": 90}}]});
//!
//! let sql = SqlTranslator::default().translate_json(&filter).unwrap();
//! assert_eq!(sql.values.len(), 2);
//!
//! let qdrant = QdrantTranslator::default().translate_json(&filter).unwrap();
//! assert!(qdrant.get("should").is_some());
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod error;
pub mod filters;
pub mod utils;

pub use backends::{PineconeTranslator, QdrantTranslator, SqlQuery, SqlTranslator, SqlValue};
pub use config::{TranslatorConfig, UnsupportedPolicy};
pub use error::FilterError;
pub use filters::{Filter, FilterTranslator, Operator, parse_filter, parse_filter_json};
