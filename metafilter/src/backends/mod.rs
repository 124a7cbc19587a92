//! Backend translators
//!
//! Each backend implements [`FilterTranslator`](crate::filters::FilterTranslator)
//! over the same parsed [`Filter`](crate::filters::Filter).

pub mod pinecone;
pub mod qdrant;
pub mod sql;

pub use pinecone::PineconeTranslator;
pub use qdrant::QdrantTranslator;
pub use sql::{SqlQuery, SqlTranslator, SqlValue};
