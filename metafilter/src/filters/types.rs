//! Filter type definitions
//!
//! A parsed filter is a tree of [`Clause`]s. Field clauses carry a validated
//! [`FieldPath`] and a typed [`Condition`]; logical clauses carry their
//! sub-filters, so nested combinators are part of the structure instead of
//! being discovered by peeking at keys.

use std::fmt;

use serde_json::{Map, Value as JsonValue};

use super::operators::Operator;
use crate::error::FilterError;

/// Dot-delimited field path, split into segments once at the filter boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path such as `user.profile.age`
    pub fn parse(path: &str) -> Result<Self, FilterError> {
        Self::from_segments(path.split('.'))
    }

    /// Build a path from already separated segments
    pub fn from_segments<I, S>(segments: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let display = segments.join(".");
        if segments.is_empty() {
            return Err(FilterError::invalid_path(display, "path is empty"));
        }
        for segment in &segments {
            if segment.is_empty() {
                return Err(FilterError::invalid_path(display, "path has an empty segment"));
            }
            if segment
                .chars()
                .any(|c| matches!(c, '\'' | '"' | '\\') || c.is_control())
            {
                return Err(FilterError::invalid_path(
                    display,
                    "quotes, backslashes and control characters are not allowed",
                ));
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Append the segments of `other` to a copy of this path
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        FieldPath { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Logical combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Nor,
}

impl LogicalOp {
    pub fn operator(&self) -> Operator {
        match self {
            LogicalOp::And => Operator::And,
            LogicalOp::Or => Operator::Or,
            LogicalOp::Not => Operator::Not,
            LogicalOp::Nor => Operator::Nor,
        }
    }

    pub fn from_operator(operator: Operator) -> Option<Self> {
        match operator {
            Operator::And => Some(LogicalOp::And),
            Operator::Or => Some(LogicalOp::Or),
            Operator::Not => Some(LogicalOp::Not),
            Operator::Nor => Some(LogicalOp::Nor),
            _ => None,
        }
    }
}

/// `$elemMatch` operand
#[derive(Debug, Clone, PartialEq)]
pub enum ElemMatch {
    /// Some element equals one of the candidates
    Values(Vec<JsonValue>),
    /// Some element satisfies every operator condition
    Conditions(Vec<Condition>),
    /// Some element is an object matching the sub-filter
    Fields(Box<Filter>),
}

/// Condition applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(JsonValue),
    Ne(JsonValue),
    Gt(JsonValue),
    Gte(JsonValue),
    Lt(JsonValue),
    Lte(JsonValue),
    In(Vec<JsonValue>),
    Nin(Vec<JsonValue>),
    All(Vec<JsonValue>),
    ElemMatch(ElemMatch),
    Size(u64),
    Exists(bool),
    Regex {
        pattern: String,
        options: Option<String>,
    },
    Contains(JsonValue),
    Not(Box<Condition>),
}

impl Condition {
    pub fn operator(&self) -> Operator {
        match self {
            Condition::Eq(_) => Operator::Eq,
            Condition::Ne(_) => Operator::Ne,
            Condition::Gt(_) => Operator::Gt,
            Condition::Gte(_) => Operator::Gte,
            Condition::Lt(_) => Operator::Lt,
            Condition::Lte(_) => Operator::Lte,
            Condition::In(_) => Operator::In,
            Condition::Nin(_) => Operator::Nin,
            Condition::All(_) => Operator::All,
            Condition::ElemMatch(_) => Operator::ElemMatch,
            Condition::Size(_) => Operator::Size,
            Condition::Exists(_) => Operator::Exists,
            Condition::Regex { .. } => Operator::Regex,
            Condition::Contains(_) => Operator::Contains,
            Condition::Not(_) => Operator::Not,
        }
    }

    /// Render back to the `{ "$op": operand }` form
    pub fn to_json(&self) -> JsonValue {
        let operand = match self {
            Condition::Eq(v)
            | Condition::Ne(v)
            | Condition::Gt(v)
            | Condition::Gte(v)
            | Condition::Lt(v)
            | Condition::Lte(v)
            | Condition::Contains(v) => v.clone(),
            Condition::In(values) | Condition::Nin(values) | Condition::All(values) => {
                JsonValue::Array(values.clone())
            }
            Condition::ElemMatch(ElemMatch::Values(values)) => JsonValue::Array(values.clone()),
            Condition::ElemMatch(ElemMatch::Conditions(conditions)) => {
                let mut map = Map::new();
                for condition in conditions {
                    if let JsonValue::Object(entry) = condition.to_json() {
                        map.extend(entry);
                    }
                }
                JsonValue::Object(map)
            }
            Condition::ElemMatch(ElemMatch::Fields(filter)) => filter.to_json(),
            Condition::Size(n) => JsonValue::from(*n),
            Condition::Exists(b) => JsonValue::Bool(*b),
            Condition::Regex { pattern, options } => {
                let mut map = Map::new();
                map.insert("$regex".to_string(), JsonValue::String(pattern.clone()));
                if let Some(options) = options {
                    map.insert("$options".to_string(), JsonValue::String(options.clone()));
                }
                return JsonValue::Object(map);
            }
            Condition::Not(inner) => inner.to_json(),
        };
        let mut map = Map::new();
        map.insert(self.operator().as_str().to_string(), operand);
        JsonValue::Object(map)
    }
}

/// One entry of a filter mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Field {
        path: FieldPath,
        condition: Condition,
    },
    Logical {
        operator: LogicalOp,
        filters: Vec<Filter>,
    },
}

impl Clause {
    /// Key this clause occupies in the filter mapping
    pub fn key(&self) -> String {
        match self {
            Clause::Field { path, .. } => path.to_string(),
            Clause::Logical { operator, .. } => operator.operator().as_str().to_string(),
        }
    }
}

/// Filter expression: a conjunction of clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Filter with a single field condition
    pub fn field(path: FieldPath, condition: Condition) -> Self {
        Self::new(vec![Clause::Field { path, condition }])
    }

    /// Filter with a single logical combination of sub-filters
    pub fn logical(operator: LogicalOp, filters: Vec<Filter>) -> Self {
        Self::new(vec![Clause::Logical { operator, filters }])
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// The single logical clause of this filter, if that is all it holds
    pub fn as_single_logical(&self) -> Option<(LogicalOp, &[Filter])> {
        match self.clauses.as_slice() {
            [Clause::Logical { operator, filters }] => Some((*operator, filters.as_slice())),
            _ => None,
        }
    }

    /// Nesting depth (a flat filter is 1; each logical group, `$not` and `$elemMatch` adds one)
    pub fn depth(&self) -> usize {
        1 + self
            .clauses
            .iter()
            .map(|clause| match clause {
                Clause::Field { condition, .. } => condition_depth(condition),
                Clause::Logical { filters, .. } => {
                    filters.iter().map(Filter::depth).max().unwrap_or(0)
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// Whether [`Filter::depth`] is greater than `max`
    ///
    /// Stops descending once the limit is passed, so the walk never goes more
    /// than `max + 1` levels deep however the filter was built.
    pub fn exceeds_depth(&self, max: usize) -> bool {
        let Some(rest) = max.checked_sub(1) else {
            return true;
        };
        self.clauses.iter().any(|clause| match clause {
            Clause::Field { condition, .. } => condition_exceeds_depth(condition, rest),
            Clause::Logical { filters, .. } => {
                filters.iter().any(|filter| filter.exceeds_depth(rest))
            }
        })
    }

    /// Render back to the mapping form
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for clause in &self.clauses {
            let value = match clause {
                Clause::Field { condition, .. } => condition.to_json(),
                Clause::Logical { filters, .. } => {
                    JsonValue::Array(filters.iter().map(Filter::to_json).collect())
                }
            };
            map.insert(clause.key(), value);
        }
        JsonValue::Object(map)
    }
}

fn condition_depth(condition: &Condition) -> usize {
    match condition {
        Condition::Not(inner) => 1 + condition_depth(inner),
        Condition::ElemMatch(ElemMatch::Conditions(conditions)) => {
            1 + conditions.iter().map(condition_depth).max().unwrap_or(0)
        }
        Condition::ElemMatch(ElemMatch::Fields(filter)) => filter.depth(),
        _ => 0,
    }
}

fn condition_exceeds_depth(condition: &Condition, max: usize) -> bool {
    match condition {
        Condition::Not(inner) => max == 0 || condition_exceeds_depth(inner, max - 1),
        Condition::ElemMatch(ElemMatch::Conditions(conditions)) => {
            max == 0
                || conditions
                    .iter()
                    .any(|condition| condition_exceeds_depth(condition, max - 1))
        }
        Condition::ElemMatch(ElemMatch::Fields(filter)) => filter.exceeds_depth(max),
        _ => false,
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
