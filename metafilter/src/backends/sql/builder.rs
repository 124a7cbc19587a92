//! SQL filter builder
//!
//! Lowers a parsed [`Filter`] into a SQLite predicate over a JSON metadata
//! column. Every literal is bound through [`SqlParams`]; the only text spliced
//! into the SQL is the configured column, quoted path segments and row aliases.

use serde_json::Value as JsonValue;

use super::params::SqlParams;
use crate::constants::{ELEMENT_ALIAS, WANTED_ALIAS};
use crate::error::FilterError;
use crate::filters::{Clause, Condition, ElemMatch, FieldPath, Filter, LogicalOp};
use crate::utils::json::flatten_leaves;

/// JSON document that field paths are resolved against
#[derive(Debug, Clone)]
pub struct Scope {
    /// SQL expression holding the document
    document: String,
    /// Number of enclosing `$elemMatch` sources
    level: usize,
}

impl Scope {
    pub fn root(column: &str) -> Self {
        Self {
            document: column.to_string(),
            level: 0,
        }
    }
}

/// What a condition reads: a path inside a document, or a `json_each` row itself
#[derive(Debug, Clone)]
enum Target {
    Path { document: String, path: FieldPath },
    Element { alias: String },
}

impl Target {
    /// SQL value of the target
    fn value(&self) -> String {
        match self {
            Target::Path { document, path } => {
                format!("json_extract({}, '{}')", document, json_path(path))
            }
            Target::Element { alias } => format!("{}.value", alias),
        }
    }

    /// JSON type name of the target, NULL when missing
    fn kind(&self) -> String {
        match self {
            Target::Path { document, path } => {
                format!("json_type({}, '{}')", document, json_path(path))
            }
            Target::Element { alias } => format!("{}.type", alias),
        }
    }

    /// Arguments addressing the target for `json_each` / `json_array_length`
    fn source(&self) -> String {
        match self {
            Target::Path { document, path } => format!("{}, '{}'", document, json_path(path)),
            Target::Element { alias } => format!("{}.value", alias),
        }
    }

    fn descend(&self, sub: &FieldPath) -> Target {
        match self {
            Target::Path { document, path } => Target::Path {
                document: document.clone(),
                path: path.join(sub),
            },
            Target::Element { alias } => Target::Path {
                document: format!("{}.value", alias),
                path: sub.clone(),
            },
        }
    }
}

/// Render a field path as a SQLite JSON path with every segment quoted
///
/// Segments never contain quotes or backslashes, so they are safe between
/// the double quotes of the JSON path and the single quotes of the literal.
pub fn json_path(path: &FieldPath) -> String {
    let mut rendered = String::from("$");
    for segment in path.segments() {
        rendered.push_str(".\"");
        rendered.push_str(segment);
        rendered.push('"');
    }
    rendered
}

/// Build the predicate for a whole filter (top-level clauses joined by AND)
pub fn build_filter(
    filter: &Filter,
    scope: &Scope,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    if filter.is_empty() {
        return Ok("1 = 1".to_string());
    }
    let parts = filter
        .clauses()
        .iter()
        .map(|clause| build_clause(clause, scope, params))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(" AND "))
}

fn build_clause(
    clause: &Clause,
    scope: &Scope,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    match clause {
        Clause::Field { path, condition } => {
            let target = Target::Path {
                document: scope.document.clone(),
                path: path.clone(),
            };
            build_condition(&target, condition, scope.level, params)
        }
        Clause::Logical { operator, filters } => build_logical(*operator, filters, scope, params),
    }
}

fn build_logical(
    operator: LogicalOp,
    filters: &[Filter],
    scope: &Scope,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    let mut parts = Vec::with_capacity(filters.len());
    collect_members(operator, filters, scope, params, &mut parts)?;

    if parts.is_empty() {
        let constant = match operator {
            LogicalOp::And | LogicalOp::Nor => "1 = 1",
            LogicalOp::Or | LogicalOp::Not => "1 = 0",
        };
        return Ok(constant.to_string());
    }

    let joined = match operator {
        LogicalOp::And | LogicalOp::Not => parts.join(" AND "),
        LogicalOp::Or | LogicalOp::Nor => parts.join(" OR "),
    };
    Ok(match operator {
        LogicalOp::And | LogicalOp::Or => format!("({})", joined),
        LogicalOp::Not | LogicalOp::Nor => format!("NOT ({})", joined),
    })
}

/// Members of a group, with same-operator `$and`/`$or` children spliced in
fn collect_members(
    operator: LogicalOp,
    filters: &[Filter],
    scope: &Scope,
    params: &mut SqlParams,
    parts: &mut Vec<String>,
) -> Result<(), FilterError> {
    for filter in filters {
        match filter.as_single_logical() {
            Some((inner, children))
                if inner == operator && matches!(operator, LogicalOp::And | LogicalOp::Or) =>
            {
                collect_members(operator, children, scope, params, parts)?;
            }
            _ => parts.push(build_member(filter, scope, params)?),
        }
    }
    Ok(())
}

fn build_member(
    filter: &Filter,
    scope: &Scope,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    let sql = build_filter(filter, scope, params)?;
    if filter.len() > 1 {
        Ok(format!("({})", sql))
    } else {
        Ok(sql)
    }
}

fn build_condition(
    target: &Target,
    condition: &Condition,
    level: usize,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    let sql = match condition {
        Condition::Eq(value) => build_equality(target, value, false, params),
        Condition::Ne(value) => build_equality(target, value, true, params),
        Condition::Gt(value) => build_ordering(target, ">", value, params),
        Condition::Gte(value) => build_ordering(target, ">=", value, params),
        Condition::Lt(value) => build_ordering(target, "<", value, params),
        Condition::Lte(value) => build_ordering(target, "<=", value, params),
        Condition::In(values) => build_membership(target, values, false, params),
        Condition::Nin(values) => build_membership(target, values, true, params),
        Condition::All(values) if values.is_empty() => "1 = 0".to_string(),
        Condition::All(values) => build_contains_all(target, values, params),
        Condition::Contains(JsonValue::Array(values)) => {
            build_contains_all(target, values, params)
        }
        Condition::Contains(value @ JsonValue::Object(_)) => {
            build_contains_document(target, value, params)?
        }
        Condition::Contains(value) => build_equality(target, value, false, params),
        Condition::ElemMatch(elem_match) => build_elem_match(target, elem_match, level, params)?,
        Condition::Size(size) => format!(
            "CASE WHEN {} = 'array' THEN json_array_length({}) = {} ELSE 0 END",
            target.kind(),
            target.source(),
            params.bind(i64::try_from(*size).unwrap_or(i64::MAX)),
        ),
        Condition::Exists(true) => format!("{} IS NOT NULL", target.kind()),
        Condition::Exists(false) => format!("{} IS NULL", target.kind()),
        Condition::Regex { pattern, options } => {
            let pattern = match options.as_deref() {
                Some(flags) if !flags.is_empty() => format!("(?{}){}", flags, pattern),
                _ => pattern.clone(),
            };
            format!("{} REGEXP {}", target.value(), params.bind(pattern))
        }
        // Unknown (NULL) counts as no match, so missing fields satisfy the negation
        Condition::Not(inner) => format!(
            "NOT COALESCE(({}), 0)",
            build_condition(target, inner, level, params)?
        ),
    };
    Ok(sql)
}

/// `$eq` / `$ne`; negation uses IS NOT so records missing the field match
fn build_equality(
    target: &Target,
    value: &JsonValue,
    negate: bool,
    params: &mut SqlParams,
) -> String {
    let expr = target.value();
    match value {
        JsonValue::Null if negate => format!("{} IS NOT NULL", expr),
        JsonValue::Null => format!("{} IS NULL", expr),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            let op = if negate { "IS NOT" } else { "=" };
            format!("{} {} json({})", expr, op, params.bind(value))
        }
        _ => {
            let op = if negate { "IS NOT" } else { "=" };
            format!("{} {} {}", expr, op, params.bind(value))
        }
    }
}

fn build_ordering(
    target: &Target,
    symbol: &str,
    value: &JsonValue,
    params: &mut SqlParams,
) -> String {
    if value.is_number() {
        format!(
            "CAST({} AS NUMERIC) {} {}",
            target.value(),
            symbol,
            params.bind(value)
        )
    } else {
        format!("{} {} {}", target.value(), symbol, params.bind(value))
    }
}

fn build_membership(
    target: &Target,
    values: &[JsonValue],
    negate: bool,
    params: &mut SqlParams,
) -> String {
    if values.is_empty() {
        return if negate { "1 = 1" } else { "1 = 0" }.to_string();
    }
    let expr = target.value();
    let placeholders: Vec<&str> = values.iter().map(|value| params.bind(value)).collect();
    let list = placeholders.join(", ");
    if negate {
        format!("({} IS NULL OR {} NOT IN ({}))", expr, expr, list)
    } else {
        format!("{} IN ({})", expr, list)
    }
}

/// Array target holds every wanted value
fn build_contains_all(target: &Target, values: &[JsonValue], params: &mut SqlParams) -> String {
    let wanted = JsonValue::Array(values.to_vec()).to_string();
    format!(
        "CASE WHEN {kind} = 'array' THEN NOT EXISTS (SELECT 1 FROM json_each({ph}) AS {want} \
         WHERE {want}.value NOT IN (SELECT value FROM json_each({source}))) ELSE 0 END",
        kind = target.kind(),
        ph = params.bind(wanted),
        want = WANTED_ALIAS,
        source = target.source(),
    )
}

/// Object target holds every leaf of `value` at the same relative path
fn build_contains_document(
    target: &Target,
    value: &JsonValue,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    let leaves = flatten_leaves(value);
    let mut parts = Vec::with_capacity(leaves.len());
    for (segments, leaf) in leaves {
        let leaf_target = if segments.is_empty() {
            target.clone()
        } else {
            target.descend(&FieldPath::from_segments(segments)?)
        };
        parts.push(build_equality(&leaf_target, leaf, false, params));
    }
    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(format!("({})", parts.join(" AND ")))
    }
}

fn element_alias(level: usize) -> String {
    if level == 0 {
        ELEMENT_ALIAS.to_string()
    } else {
        format!("{}{}", ELEMENT_ALIAS, level)
    }
}

fn build_elem_match(
    target: &Target,
    elem_match: &ElemMatch,
    level: usize,
    params: &mut SqlParams,
) -> Result<String, FilterError> {
    let alias = element_alias(level);
    let kind = target.kind();
    let source = target.source();

    let predicate = match elem_match {
        ElemMatch::Values(values) => format!(
            "{}.value IN (SELECT value FROM json_each({}))",
            alias,
            params.bind(JsonValue::Array(values.clone()).to_string())
        ),
        ElemMatch::Conditions(conditions) => {
            let element = Target::Element {
                alias: alias.clone(),
            };
            let parts = conditions
                .iter()
                .map(|condition| build_condition(&element, condition, level + 1, params))
                .collect::<Result<Vec<_>, _>>()?;
            parts.join(" AND ")
        }
        ElemMatch::Fields(filter) => {
            let scope = Scope {
                document: format!("{}.value", alias),
                level: level + 1,
            };
            format!(
                "CASE WHEN {}.type = 'object' THEN {} ELSE 0 END",
                alias,
                build_filter(filter, &scope, params)?
            )
        }
    };

    Ok(format!(
        "CASE WHEN {} = 'array' THEN EXISTS (SELECT 1 FROM json_each({}) AS {} WHERE {}) ELSE 0 END",
        kind, source, alias, predicate
    ))
}
