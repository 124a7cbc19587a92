//! Operator catalog
//!
//! The closed set of operators understood by the filter language, with their
//! category and the operand shape each one requires.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::FilterError;
use crate::utils::json::is_scalar;

/// Operator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Comparison,
    Logical,
    Array,
    Element,
    Pattern,
}

/// Every operator the filter language recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
    Not,
    Nor,
    In,
    Nin,
    All,
    ElemMatch,
    Size,
    Contains,
    Exists,
    Regex,
    Options,
}

/// Operand shape an operator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// Any value, including null
    Defined,
    /// Number or string (dates travel as ISO strings)
    Ordered,
    Sequence,
    ScalarSequence,
    Boolean,
    String,
    NonNegativeInteger,
    SequenceOrMapping,
    Mapping,
    /// Sequence of filters, or a single filter for `$not`
    Filters,
}

impl Operator {
    pub const ALL: [Operator; 19] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Nor,
        Operator::In,
        Operator::Nin,
        Operator::All,
        Operator::ElemMatch,
        Operator::Size,
        Operator::Contains,
        Operator::Exists,
        Operator::Regex,
        Operator::Options,
    ];

    /// Look up an operator by its `$`-prefixed name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::And => "$and",
            Operator::Or => "$or",
            Operator::Not => "$not",
            Operator::Nor => "$nor",
            Operator::In => "$in",
            Operator::Nin => "$nin",
            Operator::All => "$all",
            Operator::ElemMatch => "$elemMatch",
            Operator::Size => "$size",
            Operator::Contains => "$contains",
            Operator::Exists => "$exists",
            Operator::Regex => "$regex",
            Operator::Options => "$options",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte => Category::Comparison,
            Operator::And | Operator::Or | Operator::Not | Operator::Nor => Category::Logical,
            Operator::In
            | Operator::Nin
            | Operator::All
            | Operator::ElemMatch
            | Operator::Size
            | Operator::Contains => Category::Array,
            Operator::Exists => Category::Element,
            Operator::Regex | Operator::Options => Category::Pattern,
        }
    }

    pub fn operand_shape(&self) -> OperandShape {
        match self {
            Operator::Eq | Operator::Ne | Operator::Contains => OperandShape::Defined,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => OperandShape::Ordered,
            Operator::In | Operator::Nin => OperandShape::ScalarSequence,
            Operator::All => OperandShape::Sequence,
            Operator::ElemMatch => OperandShape::SequenceOrMapping,
            Operator::Size => OperandShape::NonNegativeInteger,
            Operator::Exists => OperandShape::Boolean,
            Operator::Regex | Operator::Options => OperandShape::String,
            Operator::And | Operator::Or | Operator::Nor | Operator::Not => OperandShape::Filters,
        }
    }

    /// Whether the operator combines sub-filters rather than testing a field
    pub fn is_logical(&self) -> bool {
        self.category() == Category::Logical
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OperandShape {
    /// Human-readable description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            OperandShape::Defined => "a value",
            OperandShape::Ordered => "a number or string",
            OperandShape::Sequence => "an array",
            OperandShape::ScalarSequence => "an array of non-null scalar values",
            OperandShape::Boolean => "a boolean",
            OperandShape::String => "a string",
            OperandShape::NonNegativeInteger => "a non-negative integer",
            OperandShape::SequenceOrMapping => "an array or an object",
            OperandShape::Mapping => "an object",
            OperandShape::Filters => "an array of filter objects",
        }
    }

    pub fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            OperandShape::Defined => true,
            OperandShape::Ordered => value.is_number() || value.is_string(),
            OperandShape::Sequence => value.is_array(),
            OperandShape::ScalarSequence => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| is_scalar(item) && !item.is_null())),
            OperandShape::Boolean => value.is_boolean(),
            OperandShape::String => value.is_string(),
            OperandShape::NonNegativeInteger => value.is_u64(),
            OperandShape::SequenceOrMapping => value.is_array() || value.is_object(),
            OperandShape::Mapping => value.is_object(),
            OperandShape::Filters => match value {
                JsonValue::Array(items) => items.iter().all(JsonValue::is_object),
                JsonValue::Object(_) => true,
                _ => false,
            },
        }
    }
}

/// Classify an operator name, `None` when it is not in the catalog
pub fn classify(name: &str) -> Option<Category> {
    Operator::parse(name).map(|op| op.category())
}

/// Check an operand against the shape its operator requires
pub fn validate_operand(
    field: &str,
    operator: Operator,
    value: &JsonValue,
) -> Result<(), FilterError> {
    let shape = operator.operand_shape();
    if shape.accepts(value) {
        Ok(())
    } else {
        Err(FilterError::invalid_operand(
            field,
            operator.as_str(),
            shape.describe(),
        ))
    }
}
