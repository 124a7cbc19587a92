// =============================================================================
// Parser Limits
// =============================================================================

/// Maximum size of filter JSON in bytes (64KB)
pub const DEFAULT_MAX_FILTER_BYTES: usize = 64 * 1024;

/// Maximum nesting depth of logical groups, `$not`, and `$elemMatch`
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Maximum number of elements in a sequence operand (`$in`, `$nin`, `$all`, ...)
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 1000;

// =============================================================================
// SQL Backend
// =============================================================================

/// Default JSON column holding record metadata
pub const DEFAULT_METADATA_COLUMN: &str = "metadata";

/// Row alias prefix for `json_each` sources created by `$elemMatch`
pub const ELEMENT_ALIAS: &str = "elem";

/// Row alias for the candidate set of `$all` / `$contains`
pub const WANTED_ALIAS: &str = "want";

// =============================================================================
// Backend Names
// =============================================================================

pub const BACKEND_SQL: &str = "sql";
pub const BACKEND_PINECONE: &str = "pinecone";
pub const BACKEND_QDRANT: &str = "qdrant";
