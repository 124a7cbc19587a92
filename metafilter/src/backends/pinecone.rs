//! Pinecone-style backend
//!
//! Pinecone's filter grammar is MongoDB-style already, so the tree mostly
//! passes through. Bare literals become explicit `$eq`, sibling clauses are
//! wrapped in `$and`, and `$all` is simulated with equalities.

use serde_json::{Value as JsonValue, json};

use crate::config::TranslatorConfig;
use crate::constants::BACKEND_PINECONE;
use crate::error::FilterError;
use crate::filters::{Clause, Condition, FieldPath, Filter, FilterTranslator, Operator, simulate_all};

/// Filter translator producing Pinecone metadata filters
#[derive(Debug, Clone, Default)]
pub struct PineconeTranslator {
    config: TranslatorConfig,
}

impl PineconeTranslator {
    pub fn new(config: TranslatorConfig) -> Result<Self, FilterError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn filter(&self, filter: &Filter) -> Result<JsonValue, FilterError> {
        let mut parts = filter
            .clauses()
            .iter()
            .map(|clause| self.clause(clause))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match parts.len() {
            0 => json!({}),
            1 => parts.remove(0),
            _ => json!({ "$and": parts }),
        })
    }

    fn clause(&self, clause: &Clause) -> Result<JsonValue, FilterError> {
        match clause {
            Clause::Field { path, condition } => self.condition(path, condition),
            Clause::Logical { operator, filters } => {
                let key = operator.operator().as_str();
                self.ensure_supported(key, operator.operator())?;
                let args = filters
                    .iter()
                    .map(|filter| self.filter(filter))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({ key: args }))
            }
        }
    }

    fn condition(&self, path: &FieldPath, condition: &Condition) -> Result<JsonValue, FilterError> {
        let field = path.to_string();
        let operator = condition.operator();
        let (operator, operand) = match condition {
            Condition::Eq(value) => match value {
                JsonValue::Array(_) => (Operator::In, value.clone()),
                JsonValue::Null | JsonValue::Object(_) => {
                    return Err(FilterError::invalid_operand(
                        field,
                        operator.as_str(),
                        "a scalar or an array",
                    ));
                }
                _ => (Operator::Eq, value.clone()),
            },
            Condition::Ne(value) => match value {
                JsonValue::Array(_) => (Operator::Nin, value.clone()),
                JsonValue::Null | JsonValue::Object(_) => {
                    return Err(FilterError::invalid_operand(
                        field,
                        operator.as_str(),
                        "a scalar or an array",
                    ));
                }
                _ => (Operator::Ne, value.clone()),
            },
            Condition::Gt(value)
            | Condition::Gte(value)
            | Condition::Lt(value)
            | Condition::Lte(value) => (operator, value.clone()),
            Condition::In(values) | Condition::Nin(values) => {
                (operator, JsonValue::Array(values.clone()))
            }
            Condition::Exists(exists) => (operator, JsonValue::Bool(*exists)),
            Condition::All(values) => return self.filter(&simulate_all(path, values)),
            Condition::ElemMatch(_)
            | Condition::Size(_)
            | Condition::Regex { .. }
            | Condition::Contains(_)
            | Condition::Not(_) => {
                return Err(FilterError::unsupported_by_backend(
                    BACKEND_PINECONE,
                    field,
                    operator.as_str(),
                ));
            }
        };
        Ok(json!({ field: { operator.as_str(): operand } }))
    }
}

impl FilterTranslator for PineconeTranslator {
    type Output = JsonValue;

    fn backend(&self) -> &'static str {
        BACKEND_PINECONE
    }

    fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn supports(&self, operator: Operator) -> bool {
        match operator {
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte
            | Operator::In
            | Operator::Nin
            | Operator::All
            | Operator::Exists => true,
            Operator::And | Operator::Or => true,
            Operator::Not
            | Operator::Nor
            | Operator::ElemMatch
            | Operator::Size
            | Operator::Contains
            | Operator::Regex
            | Operator::Options => false,
        }
    }

    fn translate(&self, filter: &Filter) -> Result<JsonValue, FilterError> {
        self.ensure_depth(filter)?;
        let output = self.filter(filter)?;
        tracing::debug!(
            backend = BACKEND_PINECONE,
            clauses = filter.len(),
            "Translated filter"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(filter: JsonValue) -> Result<JsonValue, FilterError> {
        PineconeTranslator::default().translate_json(&filter)
    }

    #[test]
    fn literal_becomes_explicit_eq() {
        assert_eq!(
            translate(json!({"status": "active"})).unwrap(),
            json!({"status": {"$eq": "active"}})
        );
    }

    #[test]
    fn shorthand_and_explicit_eq_agree() {
        assert_eq!(
            translate(json!({"status": "active"})).unwrap(),
            translate(json!({"status": {"$eq": "active"}})).unwrap()
        );
    }

    #[test]
    fn array_equality_becomes_in() {
        assert_eq!(
            translate(json!({"genre": ["comedy", "drama"]})).unwrap(),
            json!({"genre": {"$in": ["comedy", "drama"]}})
        );
        assert_eq!(
            translate(json!({"genre": {"$ne": ["horror"]}})).unwrap(),
            json!({"genre": {"$nin": ["horror"]}})
        );
    }

    #[test]
    fn comparison_operators_pass_through() {
        assert_eq!(
            translate(json!({"year": {"$gte": 2020}, "rating": {"$lt": 4.5}})).unwrap(),
            json!({"$and": [{"year": {"$gte": 2020}}, {"rating": {"$lt": 4.5}}]})
        );
        assert_eq!(
            translate(json!({"tag": {"$exists": false}})).unwrap(),
            json!({"tag": {"$exists": false}})
        );
    }

    #[test]
    fn logical_shape_mirrors_input() {
        let input = json!({
            "$or": [
                {"genre": {"$in": ["comedy"]}},
                {"$and": [{"year": {"$gt": 2000}}, {"year": {"$lt": 2010}}]}
            ]
        });
        assert_eq!(translate(input.clone()).unwrap(), input);
    }

    #[test]
    fn all_is_simulated() {
        assert_eq!(
            translate(json!({"tags": {"$all": ["a", "b"]}})).unwrap(),
            json!({"$and": [{"tags": {"$eq": "a"}}, {"tags": {"$eq": "b"}}]})
        );
        assert_eq!(
            translate(json!({"tags": {"$all": []}})).unwrap(),
            json!({"tags": {"$in": []}})
        );
    }

    #[test]
    fn empty_filter() {
        assert_eq!(translate(json!({})).unwrap(), json!({}));
        assert_eq!(translate(JsonValue::Null).unwrap(), json!({}));
    }

    #[test]
    fn null_and_object_equality_are_invalid() {
        let err = translate(json!({"owner": null})).unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERAND");
        assert!(translate(json!({"owner": {"name": "x"}})).is_err());
    }

    #[test]
    fn unsupported_operators_are_rejected() {
        for filter in [
            json!({"$nor": [{"a": 1}]}),
            json!({"$not": {"a": 1}}),
            json!({"a": {"$size": 1}}),
            json!({"a": {"$regex": "^x"}}),
            json!({"a": {"$elemMatch": {"$gt": 1}}}),
            json!({"a": {"$contains": "x"}}),
            json!({"a": {"$not": {"$eq": 1}}}),
        ] {
            let err = translate(filter.clone()).unwrap_err();
            assert!(
                matches!(err, FilterError::UnsupportedByBackend { backend: "pinecone", .. }),
                "{filter}: {err}"
            );
        }
    }

    #[test]
    fn supports_matches_catalog() {
        let translator = PineconeTranslator::default();
        let supported: Vec<_> = Operator::ALL
            .iter()
            .filter(|op| translator.supports(**op))
            .map(|op| op.as_str())
            .collect();
        assert_eq!(
            supported,
            ["$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$and", "$or", "$in", "$nin", "$all", "$exists"]
        );
    }
}
