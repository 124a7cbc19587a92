//! SQL utility functions

/// Check that a column reference is a bare or table-qualified identifier
///
/// Column names are interpolated into SQL text, so only `[A-Za-z_][A-Za-z0-9_]*`
/// segments (at most two, joined by `.`) are accepted.
///
/// # Example
///
/// ```
/// use metafilter::utils::sql::is_valid_column_reference;
///
/// assert!(is_valid_column_reference("metadata"));
/// assert!(is_valid_column_reference("docs.metadata"));
/// assert!(!is_valid_column_reference("metadata); DROP TABLE docs; --"));
/// ```
pub fn is_valid_column_reference(column: &str) -> bool {
    let parts: Vec<&str> = column.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

/// Count `?` placeholders outside of single-quoted string literals
pub fn count_placeholders(sql: &str) -> usize {
    let mut in_literal = false;
    let mut count = 0;
    for c in sql.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}
