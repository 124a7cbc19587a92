//! Qdrant-style backend
//!
//! Logical operators become `must` / `should` / `must_not` groups and every
//! field condition becomes a `{ "key": .., <comparator>: .. }` record.
//! Negation is a `"negate": true` flag on the record itself.

use serde_json::{Map, Value as JsonValue, json};

use crate::config::{TranslatorConfig, UnsupportedPolicy};
use crate::constants::BACKEND_QDRANT;
use crate::error::FilterError;
use crate::filters::{
    Clause, Condition, FieldPath, Filter, FilterTranslator, LogicalOp, Operator, simulate_all,
};

/// Translated piece of a filter
#[derive(Debug)]
enum Node {
    /// Single condition record
    Leaf(JsonValue),
    /// `must` / `should` / `must_not` group
    Group(JsonValue),
}

impl Node {
    fn into_value(self) -> JsonValue {
        match self {
            Node::Leaf(value) | Node::Group(value) => value,
        }
    }
}

/// Filter translator producing Qdrant payload filters
#[derive(Debug, Clone, Default)]
pub struct QdrantTranslator {
    config: TranslatorConfig,
}

impl QdrantTranslator {
    pub fn new(config: TranslatorConfig) -> Result<Self, FilterError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn key(&self, path: &FieldPath) -> String {
        match &self.config.qdrant.key_prefix {
            Some(prefix) => format!("{}.{}", prefix, path),
            None => path.to_string(),
        }
    }

    fn filter(&self, filter: &Filter) -> Result<Option<Node>, FilterError> {
        let mut nodes = Vec::with_capacity(filter.len());
        for clause in filter.clauses() {
            if let Some(node) = self.clause(clause)? {
                nodes.push(node);
            }
        }
        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(group("must", nodes)),
        })
    }

    fn clause(&self, clause: &Clause) -> Result<Option<Node>, FilterError> {
        match clause {
            Clause::Field { path, condition } => self.condition(path, condition),
            Clause::Logical { operator, filters } => self.logical(*operator, filters),
        }
    }

    fn logical(&self, operator: LogicalOp, filters: &[Filter]) -> Result<Option<Node>, FilterError> {
        let mut nodes = Vec::with_capacity(filters.len());
        for filter in filters {
            if let Some(node) = self.filter(filter)? {
                nodes.push(node);
            }
        }
        // Every member was dropped
        if nodes.is_empty() && !filters.is_empty() {
            return Ok(None);
        }

        Ok(Some(match operator {
            LogicalOp::And => group("must", nodes),
            LogicalOp::Or => group("should", nodes),
            LogicalOp::Nor => group("must_not", nodes),
            LogicalOp::Not if nodes.len() > 1 => group("must_not", vec![group("must", nodes)]),
            LogicalOp::Not => group("must_not", nodes),
        }))
    }

    fn condition(
        &self,
        path: &FieldPath,
        condition: &Condition,
    ) -> Result<Option<Node>, FilterError> {
        let key = self.key(path);
        let node = match condition {
            Condition::Eq(value) => self.equality(path, &key, value)?,
            Condition::Ne(value) => negate(self.equality(path, &key, value)?),
            Condition::Gt(value) => leaf(&key, "range", json!({ "gt": value })),
            Condition::Gte(value) => leaf(&key, "range", json!({ "gte": value })),
            Condition::Lt(value) => leaf(&key, "range", json!({ "lt": value })),
            Condition::Lte(value) => leaf(&key, "range", json!({ "lte": value })),
            Condition::In(values) => leaf(&key, "match", json!({ "any": values })),
            Condition::Nin(values) => negate(leaf(&key, "match", json!({ "any": values }))),
            Condition::All(values) => return self.filter(&simulate_all(path, values)),
            Condition::Size(size) => leaf(&key, "values_count", json!({ "gte": size, "lte": size })),
            Condition::Exists(true) => negate(leaf(&key, "is_empty", JsonValue::Bool(true))),
            Condition::Exists(false) => leaf(&key, "is_empty", JsonValue::Bool(true)),
            Condition::Not(inner) => return Ok(self.condition(path, inner)?.map(negate)),
            Condition::ElemMatch(_) | Condition::Contains(_) | Condition::Regex { .. } => {
                return self.unsupported(path, condition.operator());
            }
        };
        Ok(Some(node))
    }

    fn equality(&self, path: &FieldPath, key: &str, value: &JsonValue) -> Result<Node, FilterError> {
        match value {
            JsonValue::Null => Ok(leaf(key, "is_null", JsonValue::Bool(true))),
            JsonValue::Array(items) => Ok(leaf(key, "match", json!({ "any": items }))),
            JsonValue::Object(_) => Err(FilterError::invalid_operand(
                path.to_string(),
                Operator::Eq.as_str(),
                "a scalar, null or an array",
            )),
            _ => Ok(leaf(key, "match", json!({ "value": value }))),
        }
    }

    fn unsupported(
        &self,
        path: &FieldPath,
        operator: Operator,
    ) -> Result<Option<Node>, FilterError> {
        let field = path.to_string();
        match self.config.qdrant.unsupported {
            UnsupportedPolicy::Reject => Err(FilterError::unsupported_by_backend(
                BACKEND_QDRANT,
                field,
                operator.as_str(),
            )),
            UnsupportedPolicy::Drop => {
                tracing::warn!(
                    backend = BACKEND_QDRANT,
                    field = %field,
                    operator = %operator,
                    "Dropping unsupported filter condition"
                );
                Ok(None)
            }
        }
    }
}

fn leaf(key: &str, comparator: &str, operand: JsonValue) -> Node {
    Node::Leaf(json!({ "key": key, comparator: operand }))
}

fn group(name: &str, nodes: Vec<Node>) -> Node {
    let members: Vec<JsonValue> = nodes.into_iter().map(Node::into_value).collect();
    Node::Group(json!({ name: members }))
}

/// Flip the negation flag of a leaf record; groups are wrapped in `must_not`
fn negate(node: Node) -> Node {
    match node {
        Node::Leaf(JsonValue::Object(mut record)) => {
            if record.remove("negate").is_none() {
                record.insert("negate".to_string(), JsonValue::Bool(true));
            }
            Node::Leaf(JsonValue::Object(record))
        }
        Node::Leaf(other) => Node::Leaf(other),
        node @ Node::Group(_) => group("must_not", vec![node]),
    }
}

impl FilterTranslator for QdrantTranslator {
    type Output = JsonValue;

    fn backend(&self) -> &'static str {
        BACKEND_QDRANT
    }

    fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn supports(&self, operator: Operator) -> bool {
        !matches!(
            operator,
            Operator::ElemMatch | Operator::Contains | Operator::Regex | Operator::Options
        )
    }

    /// Always a group: a lone leaf is wrapped in `must`, an empty filter is `{}`
    fn translate(&self, filter: &Filter) -> Result<JsonValue, FilterError> {
        self.ensure_depth(filter)?;
        let output = match self.filter(filter)? {
            None => JsonValue::Object(Map::new()),
            Some(Node::Group(value)) => value,
            Some(record @ Node::Leaf(_)) => group("must", vec![record]).into_value(),
        };
        tracing::debug!(
            backend = BACKEND_QDRANT,
            clauses = filter.len(),
            "Translated filter"
        );
        Ok(output)
    }
}
