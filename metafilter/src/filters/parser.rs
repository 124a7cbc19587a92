//! Filter parsing
//!
//! Parses Mongo-style JSON filters into [`Filter`] trees. All operator and
//! operand validation happens here, so translators only ever see well-formed
//! filters.

use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use super::base::normalize_value;
use super::operators::{OperandShape, Operator, validate_operand};
use super::types::{Clause, Condition, ElemMatch, FieldPath, Filter, LogicalOp};
use crate::config::TranslatorConfig;
use crate::error::FilterError;
use crate::utils::json::{depth as json_depth, flatten_leaves};

/// Flags accepted by `$options`
const REGEX_FLAGS: &str = "imsx";

/// Parse a filter from JSON text
///
/// Validates the text size, then parses and validates the filter tree.
pub fn parse_filter_json(json_str: &str, config: &TranslatorConfig) -> Result<Filter, FilterError> {
    if json_str.len() > config.max_filter_bytes {
        return Err(FilterError::TooLarge {
            max_bytes: config.max_filter_bytes,
        });
    }

    let value: JsonValue =
        serde_json::from_str(json_str).map_err(|e| FilterError::InvalidFilter(e.to_string()))?;

    parse_filter(&value, config)
}

/// Parse a filter from a JSON value
///
/// `null` is treated as an absent filter and yields an empty [`Filter`].
pub fn parse_filter(value: &JsonValue, config: &TranslatorConfig) -> Result<Filter, FilterError> {
    let filter = match value {
        JsonValue::Null => Filter::default(),
        JsonValue::Object(map) => Parser { config }.filter(map, 1)?,
        _ => {
            return Err(FilterError::InvalidFilter(
                "filter must be a JSON object".to_string(),
            ));
        }
    };
    tracing::trace!(filter = %filter, clauses = filter.len(), "Parsed filter");
    Ok(filter)
}

struct Parser<'a> {
    config: &'a TranslatorConfig,
}

impl Parser<'_> {
    fn check_depth(&self, depth: usize) -> Result<(), FilterError> {
        if depth > self.config.max_depth {
            return Err(FilterError::TooDeep {
                max_depth: self.config.max_depth,
            });
        }
        Ok(())
    }

    fn filter(&self, map: &Map<String, JsonValue>, depth: usize) -> Result<Filter, FilterError> {
        self.check_depth(depth)?;
        let clauses = map
            .iter()
            .map(|(key, value)| self.clause(key, value, depth))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Filter::new(clauses))
    }

    fn clause(&self, key: &str, value: &JsonValue, depth: usize) -> Result<Clause, FilterError> {
        if !key.starts_with('$') {
            let path = FieldPath::parse(key)?;
            let condition = self.condition(key, value, depth)?;
            return Ok(Clause::Field { path, condition });
        }

        let operator =
            Operator::parse(key).ok_or_else(|| FilterError::unsupported_operator(key, key))?;
        let Some(logical) = LogicalOp::from_operator(operator) else {
            return Err(FilterError::malformed(
                key,
                format!("operator '{}' must be applied to a field", key),
            ));
        };
        validate_operand(key, operator, value)?;

        let filters = match value {
            JsonValue::Array(items) => {
                self.check_len(key, operator, items.len())?;
                items
                    .iter()
                    .map(|item| self.sub_filter(key, operator, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?
            }
            JsonValue::Object(map) if logical == LogicalOp::Not => {
                vec![self.filter(map, depth + 1)?]
            }
            _ => {
                return Err(FilterError::invalid_operand(
                    key,
                    operator.as_str(),
                    OperandShape::Filters.describe(),
                ));
            }
        };

        Ok(Clause::Logical {
            operator: logical,
            filters,
        })
    }

    fn sub_filter(
        &self,
        key: &str,
        operator: Operator,
        item: &JsonValue,
        depth: usize,
    ) -> Result<Filter, FilterError> {
        match item {
            JsonValue::Object(map) => self.filter(map, depth),
            _ => Err(FilterError::invalid_operand(
                key,
                operator.as_str(),
                OperandShape::Filters.describe(),
            )),
        }
    }

    fn condition(
        &self,
        field: &str,
        value: &JsonValue,
        depth: usize,
    ) -> Result<Condition, FilterError> {
        match value {
            JsonValue::Object(map) if map.is_empty() => {
                Err(FilterError::malformed(field, "empty condition mapping"))
            }
            JsonValue::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
                if !map.keys().all(|k| k.starts_with('$')) {
                    return Err(FilterError::malformed(
                        field,
                        "cannot mix operators and field names",
                    ));
                }
                self.operator_mapping(field, map, depth)
            }
            _ => Ok(Condition::Eq(self.value(value, depth)?)),
        }
    }

    fn operator_mapping(
        &self,
        field: &str,
        map: &Map<String, JsonValue>,
        depth: usize,
    ) -> Result<Condition, FilterError> {
        if let (2, Some(pattern), Some(options)) =
            (map.len(), map.get("$regex"), map.get("$options"))
        {
            return self.regex(field, pattern, Some(options));
        }

        match map.iter().next() {
            Some((name, operand)) if map.len() == 1 => self.operator(field, name, operand, depth),
            _ => Err(FilterError::malformed(
                field,
                format!("expected exactly one operator, found {}", map.len()),
            )),
        }
    }

    fn operator(
        &self,
        field: &str,
        name: &str,
        operand: &JsonValue,
        depth: usize,
    ) -> Result<Condition, FilterError> {
        let operator =
            Operator::parse(name).ok_or_else(|| FilterError::unsupported_operator(field, name))?;

        if !operator.is_logical() && operator != Operator::Options {
            validate_operand(field, operator, operand)?;
        }

        let condition = match operator {
            Operator::Eq => Condition::Eq(self.value(operand, depth)?),
            Operator::Ne => Condition::Ne(self.value(operand, depth)?),
            Operator::Gt => Condition::Gt(self.value(operand, depth)?),
            Operator::Gte => Condition::Gte(self.value(operand, depth)?),
            Operator::Lt => Condition::Lt(self.value(operand, depth)?),
            Operator::Lte => Condition::Lte(self.value(operand, depth)?),
            Operator::In => Condition::In(self.sequence(field, operator, operand, depth)?),
            Operator::Nin => Condition::Nin(self.sequence(field, operator, operand, depth)?),
            Operator::All => Condition::All(self.sequence(field, operator, operand, depth)?),
            Operator::ElemMatch => self.elem_match(field, operand, depth)?,
            Operator::Size => match operand.as_u64() {
                Some(size) => Condition::Size(size),
                None => {
                    return Err(FilterError::invalid_operand(
                        field,
                        name,
                        OperandShape::NonNegativeInteger.describe(),
                    ));
                }
            },
            Operator::Exists => match operand.as_bool() {
                Some(exists) => Condition::Exists(exists),
                None => {
                    return Err(FilterError::invalid_operand(
                        field,
                        name,
                        OperandShape::Boolean.describe(),
                    ));
                }
            },
            Operator::Regex => self.regex(field, operand, None)?,
            Operator::Contains => {
                let value = self.value(operand, depth)?;
                for (segments, _) in flatten_leaves(&value) {
                    if !segments.is_empty() {
                        FieldPath::from_segments(segments)?;
                    }
                }
                Condition::Contains(value)
            }
            Operator::Not => {
                self.check_depth(depth + 1)?;
                match operand {
                    JsonValue::Object(map)
                        if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) =>
                    {
                        Condition::Not(Box::new(self.operator_mapping(field, map, depth + 1)?))
                    }
                    _ => {
                        return Err(FilterError::invalid_operand(
                            field,
                            name,
                            OperandShape::Mapping.describe(),
                        ));
                    }
                }
            }
            Operator::Options => {
                return Err(FilterError::malformed(field, "'$options' requires '$regex'"));
            }
            Operator::And | Operator::Or | Operator::Nor => {
                return Err(FilterError::malformed(
                    field,
                    format!("logical operator '{}' cannot be applied to a field", name),
                ));
            }
        };

        Ok(condition)
    }

    fn elem_match(
        &self,
        field: &str,
        operand: &JsonValue,
        depth: usize,
    ) -> Result<Condition, FilterError> {
        self.check_depth(depth + 1)?;
        let elem_match = match operand {
            JsonValue::Array(_) => {
                ElemMatch::Values(self.sequence(field, Operator::ElemMatch, operand, depth)?)
            }
            JsonValue::Object(map) if map.is_empty() => {
                return Err(FilterError::malformed(field, "empty $elemMatch mapping"));
            }
            JsonValue::Object(map) if map.keys().all(|k| k.starts_with('$')) => {
                if map.contains_key("$options") && !map.contains_key("$regex") {
                    return Err(FilterError::malformed(field, "'$options' requires '$regex'"));
                }
                let mut conditions = Vec::with_capacity(map.len());
                for (name, value) in map {
                    match name.as_str() {
                        "$options" => {}
                        "$regex" => {
                            conditions.push(self.regex(field, value, map.get("$options"))?)
                        }
                        _ => conditions.push(self.operator(field, name, value, depth + 1)?),
                    }
                }
                ElemMatch::Conditions(conditions)
            }
            JsonValue::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
                return Err(FilterError::malformed(
                    field,
                    "cannot mix operators and field names in $elemMatch",
                ));
            }
            JsonValue::Object(map) => ElemMatch::Fields(Box::new(self.filter(map, depth + 1)?)),
            _ => {
                return Err(FilterError::invalid_operand(
                    field,
                    Operator::ElemMatch.as_str(),
                    OperandShape::SequenceOrMapping.describe(),
                ));
            }
        };
        Ok(Condition::ElemMatch(elem_match))
    }

    fn regex(
        &self,
        field: &str,
        pattern: &JsonValue,
        options: Option<&JsonValue>,
    ) -> Result<Condition, FilterError> {
        validate_operand(field, Operator::Regex, pattern)?;
        let pattern = pattern.as_str().unwrap_or_default();
        if Regex::new(pattern).is_err() {
            return Err(FilterError::invalid_operand(
                field,
                Operator::Regex.as_str(),
                "a valid regular expression",
            ));
        }

        let options = match options {
            Some(options) => {
                validate_operand(field, Operator::Options, options)?;
                let flags = options.as_str().unwrap_or_default();
                if !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
                    return Err(FilterError::invalid_operand(
                        field,
                        Operator::Options.as_str(),
                        "a combination of the flags i, m, s, x",
                    ));
                }
                (!flags.is_empty()).then(|| flags.to_string())
            }
            None => None,
        };

        Ok(Condition::Regex {
            pattern: pattern.to_string(),
            options,
        })
    }

    fn sequence(
        &self,
        field: &str,
        operator: Operator,
        operand: &JsonValue,
        depth: usize,
    ) -> Result<Vec<JsonValue>, FilterError> {
        let items = operand.as_array().ok_or_else(|| {
            FilterError::invalid_operand(field, operator.as_str(), OperandShape::Sequence.describe())
        })?;
        self.check_len(field, operator, items.len())?;
        items.iter().map(|item| self.value(item, depth)).collect()
    }

    fn check_len(&self, field: &str, operator: Operator, len: usize) -> Result<(), FilterError> {
        if len > self.config.max_sequence_len {
            return Err(FilterError::malformed(
                field,
                format!(
                    "'{}' accepts at most {} values, found {}",
                    operator, self.config.max_sequence_len, len
                ),
            ));
        }
        Ok(())
    }

    /// Operand value: bounded in depth and normalized
    fn value(&self, value: &JsonValue, depth: usize) -> Result<JsonValue, FilterError> {
        self.check_depth(depth + json_depth(value))?;
        if self.config.normalize_dates {
            Ok(normalize_value(value.clone()))
        } else {
            Ok(value.clone())
        }
    }
}

impl TryFrom<&JsonValue> for Filter {
    type Error = FilterError;

    fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
        parse_filter(value, &TranslatorConfig::default())
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_filter_json(s, &TranslatorConfig::default())
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Filter::try_from(&value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Filter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: JsonValue) -> Result<Filter, FilterError> {
        parse_filter(&value, &TranslatorConfig::default())
    }

    #[test]
    fn parse_literal_is_equality() {
        let filter = parse(json!({"status": "active"})).unwrap();
        assert_eq!(
            filter.clauses(),
            [Clause::Field {
                path: FieldPath::parse("status").unwrap(),
                condition: Condition::Eq(json!("active")),
            }]
        );
    }

    #[test]
    fn parse_null_is_empty_filter() {
        let filter = parse(JsonValue::Null).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn parse_rejects_non_object() {
        let err = parse(json!([1, 2])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilter(_)));
    }

    #[test]
    fn parse_keeps_insertion_order() {
        let filter = parse(json!({"b": 1, "a": 2, "$or": [{"c": 3}]})).unwrap();
        let keys: Vec<String> = filter.clauses().iter().map(Clause::key).collect();
        assert_eq!(keys, vec!["b", "a", "$or"]);
    }

    #[test]
    fn parse_nested_logical_is_structural() {
        let filter = parse(json!({"$and": [{"$or": [{"a": 1}, {"b": 2}]}, {"c": 3}]})).unwrap();
        let (op, children) = filter.as_single_logical().unwrap();
        assert_eq!(op, LogicalOp::And);
        assert_eq!(children[0].as_single_logical().map(|(op, _)| op), Some(LogicalOp::Or));
        assert!(children[1].as_single_logical().is_none());
    }

    #[test]
    fn parse_not_accepts_single_filter() {
        let filter = parse(json!({"$not": {"status": "deleted"}})).unwrap();
        let (op, children) = filter.as_single_logical().unwrap();
        assert_eq!(op, LogicalOp::Not);
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn parse_and_rejects_object_operand() {
        let err = parse(json!({"$and": {"a": 1}})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperand { .. }));
    }

    #[test]
    fn parse_and_rejects_non_object_items() {
        let err = parse(json!({"$or": [{"a": 1}, 5]})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperand { .. }));
    }

    #[test]
    fn parse_unknown_operator() {
        let err = parse(json!({"age": {"$bogus": 1}})).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnsupportedOperator {
                field: "age".to_string(),
                operator: "$bogus".to_string(),
            }
        );
    }

    #[test]
    fn parse_unknown_top_level_operator() {
        let err = parse(json!({"$bogus": [{"a": 1}]})).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
    }

    #[test]
    fn parse_field_operator_at_top_level_is_malformed() {
        let err = parse(json!({"$gt": 5})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_multiple_operators_is_malformed() {
        let err = parse(json!({"age": {"$gt": 1, "$lt": 5}})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_mixed_keys_is_malformed() {
        let err = parse(json!({"user": {"$eq": 1, "name": "x"}})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_empty_condition_is_malformed() {
        let err = parse(json!({"user": {}})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_plain_object_is_document_equality() {
        let filter = parse(json!({"user": {"name": "x"}})).unwrap();
        assert!(matches!(
            &filter.clauses()[0],
            Clause::Field { condition: Condition::Eq(v), .. } if v == &json!({"name": "x"})
        ));
    }

    #[test]
    fn parse_shape_errors() {
        for value in [
            json!({"tags": {"$all": "a"}}),
            json!({"tags": {"$in": "a"}}),
            json!({"tags": {"$nin": 1}}),
            json!({"tags": {"$exists": "yes"}}),
            json!({"age": {"$gt": null}}),
            json!({"tags": {"$size": "2"}}),
            json!({"name": {"$regex": 5}}),
        ] {
            let err = parse(value.clone()).unwrap_err();
            assert!(matches!(err, FilterError::InvalidOperand { .. }), "{value}");
        }
    }

    #[test]
    fn parse_regex_with_options() {
        let filter = parse(json!({"name": {"$regex": "^ab", "$options": "i"}})).unwrap();
        assert!(matches!(
            &filter.clauses()[0],
            Clause::Field { condition: Condition::Regex { pattern, options }, .. }
                if pattern == "^ab" && options.as_deref() == Some("i")
        ));
    }

    #[test]
    fn parse_regex_rejects_invalid_pattern() {
        let err = parse(json!({"name": {"$regex": "("}})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperand { .. }));
    }

    #[test]
    fn parse_regex_rejects_unknown_flag() {
        let err = parse(json!({"name": {"$regex": "a", "$options": "g"}})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperand { .. }));
    }

    #[test]
    fn parse_options_without_regex() {
        let err = parse(json!({"name": {"$options": "i"}})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_field_level_not() {
        let filter = parse(json!({"score": {"$not": {"$gt": 90}}})).unwrap();
        assert!(matches!(
            &filter.clauses()[0],
            Clause::Field { condition: Condition::Not(inner), .. }
                if **inner == Condition::Gt(json!(90))
        ));
    }

    #[test]
    fn parse_field_level_not_requires_operator_mapping() {
        let err = parse(json!({"score": {"$not": 5}})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperand { .. }));
    }

    #[test]
    fn parse_field_level_logical_is_malformed() {
        let err = parse(json!({"score": {"$and": [{"$gt": 1}]}})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_elem_match_variants() {
        let values = parse(json!({"tags": {"$elemMatch": ["a", "b"]}})).unwrap();
        assert!(matches!(
            &values.clauses()[0],
            Clause::Field { condition: Condition::ElemMatch(ElemMatch::Values(v)), .. } if v.len() == 2
        ));

        let conditions = parse(json!({"scores": {"$elemMatch": {"$gte": 80, "$lt": 90}}})).unwrap();
        assert!(matches!(
            &conditions.clauses()[0],
            Clause::Field { condition: Condition::ElemMatch(ElemMatch::Conditions(c)), .. } if c.len() == 2
        ));

        let fields = parse(json!({"items": {"$elemMatch": {"name": "x", "qty": {"$gt": 1}}}})).unwrap();
        assert!(matches!(
            &fields.clauses()[0],
            Clause::Field { condition: Condition::ElemMatch(ElemMatch::Fields(f)), .. } if f.len() == 2
        ));
    }

    #[test]
    fn parse_elem_match_rejects_mixed_keys() {
        let err = parse(json!({"items": {"$elemMatch": {"$gt": 1, "name": "x"}}})).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_contains_validates_nested_keys() {
        assert!(parse(json!({"user": {"$contains": {"profile": {"age": 3}}}})).is_ok());
        let err = parse(json!({"user": {"$contains": {"pro'file": 1}}})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFieldPath { .. }));
    }

    #[test]
    fn parse_rejects_unsafe_field_path() {
        let err = parse(json!({"a'b": 1})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFieldPath { .. }));
    }

    #[test]
    fn parse_normalizes_dates() {
        let filter = parse(json!({"created": {"$gte": "2024-01-01T00:00:00Z"}})).unwrap();
        assert!(matches!(
            &filter.clauses()[0],
            Clause::Field { condition: Condition::Gte(v), .. } if v == &json!("2024-01-01T00:00:00.000Z")
        ));
    }

    #[test]
    fn parse_date_normalization_can_be_disabled() {
        let config = TranslatorConfig {
            normalize_dates: false,
            ..TranslatorConfig::default()
        };
        let filter = parse_filter(&json!({"created": "2024-01-01T00:00:00Z"}), &config).unwrap();
        assert!(matches!(
            &filter.clauses()[0],
            Clause::Field { condition: Condition::Eq(v), .. } if v == &json!("2024-01-01T00:00:00Z")
        ));
    }

    #[test]
    fn parse_rejects_deep_nesting() {
        let config = TranslatorConfig {
            max_depth: 4,
            ..TranslatorConfig::default()
        };
        let mut value = json!({"a": 1});
        for _ in 0..5 {
            value = json!({"$and": [value]});
        }
        let err = parse_filter(&value, &config).unwrap_err();
        assert_eq!(err, FilterError::TooDeep { max_depth: 4 });
    }

    #[test]
    fn parse_rejects_long_sequences() {
        let config = TranslatorConfig {
            max_sequence_len: 2,
            ..TranslatorConfig::default()
        };
        let err = parse_filter(&json!({"tags": {"$in": [1, 2, 3]}}), &config).unwrap_err();
        assert!(matches!(err, FilterError::MalformedCondition { .. }));
    }

    #[test]
    fn parse_json_size_limit() {
        let config = TranslatorConfig {
            max_filter_bytes: 10,
            ..TranslatorConfig::default()
        };
        let err = parse_filter_json(r#"{"status": "active"}"#, &config).unwrap_err();
        assert_eq!(err, FilterError::TooLarge { max_bytes: 10 });
    }

    #[test]
    fn parse_json_invalid_text() {
        let err = parse_filter_json("not valid json", &TranslatorConfig::default()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilter(_)));
    }

    #[test]
    fn filter_from_str_and_deserialize() {
        let from_str: Filter = r#"{"age": {"$gte": 21}}"#.parse().unwrap();
        let deserialized: Filter = serde_json::from_str(r#"{"age": {"$gte": 21}}"#).unwrap();
        assert_eq!(from_str, deserialized);
        assert_eq!(serde_json::to_value(&from_str).unwrap(), json!({"age": {"$gte": 21}}));
    }

    #[test]
    fn deserialize_reports_filter_errors() {
        let result: Result<Filter, _> = serde_json::from_str(r#"{"age": {"$bogus": 1}}"#);
        assert!(result.is_err());
    }
}
