//! Store-agnostic filter language
//!
//! Filters use MongoDB/Sift-style operators over record metadata. They are
//! parsed once into a typed tree and then lowered by a backend translator.
//!
//! ## Usage
//!
//! ```
//! use metafilter::config::TranslatorConfig;
//! use metafilter::filters::{Clause, parse_filter_json};
//!
//! let json_str = r#"{"status": "active", "age": {"$gte": 21}}"#;
//! let filter = parse_filter_json(json_str, &TranslatorConfig::default()).unwrap();
//! assert_eq!(filter.len(), 2);
//! assert!(matches!(filter.clauses()[0], Clause::Field { .. }));
//! ```

mod base;
mod operators;
mod parser;
mod types;

pub use base::{FilterTranslator, datetime_value, normalize_value, simulate_all};
pub use operators::{Category, OperandShape, Operator, classify, validate_operand};
pub use parser::{parse_filter, parse_filter_json};
pub use types::{Clause, Condition, ElemMatch, FieldPath, Filter, LogicalOp};
