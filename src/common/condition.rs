use crate::common;
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::{Deserialize, Serialize};
use serde_dynamo::to_attribute_value;
use std::{collections, ops};

/// Logical operator joining filter clauses.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all clauses must be true.
    And,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
        }
    }
}

/// Predicate applied to a field.
///
/// Deserializes from `{"field": .., "type": .., "keyword": ..}` where `type`
/// is one of `keyword`, `const`, `date` or `exist`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "keyword")]
pub enum PredicateKind<T> {
    /// Substring or member containment.
    Keyword(T),
    /// Equality.
    Const(T),
    /// Inclusive range given as `start/end`.
    Date(String),
    /// Attribute presence.
    Exist,
}

/// Filter predicate descriptor.
///
/// ```rust
/// use dynamodb_expr::common::condition;
///
/// let predicates = vec![
///     condition::Predicate {
///         field: "Status".to_string(),
///         kind: condition::PredicateKind::Const("active".to_string()),
///     },
///     condition::Predicate {
///         field: "Deleted".to_string(),
///         kind: condition::PredicateKind::Exist,
///     },
/// ];
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Predicate<T> {
    /// The filtered field.
    pub field: String,
    /// The predicate and its comparison literal.
    #[serde(flatten)]
    pub kind: PredicateKind<T>,
}

/// Placeholder token for a field: path separators dropped, quotes normalized.
fn get_token(field: &str) -> String {
    field.replace('.', "").replace('"', "'")
}

/// Marshal a comparison literal, accepting string, boolean and number values only.
fn get_attribute_value<T: Serialize>(field: &str, value: T) -> Result<types::AttributeValue> {
    let value: types::AttributeValue = to_attribute_value(value)?;
    match value {
        types::AttributeValue::S(_) | types::AttributeValue::Bool(_) | types::AttributeValue::N(_) => {
            Ok(value)
        }
        other => Err(Error::UnsupportedValueType {
            field: field.to_string(),
            kind: get_kind(&other).to_string(),
        }),
    }
}

fn get_kind(value: &types::AttributeValue) -> &'static str {
    match value {
        types::AttributeValue::B(_) => "binary",
        types::AttributeValue::Bool(_) => "boolean",
        types::AttributeValue::Bs(_) => "binary set",
        types::AttributeValue::L(_) => "list",
        types::AttributeValue::M(_) => "map",
        types::AttributeValue::N(_) => "number",
        types::AttributeValue::Ns(_) => "number set",
        types::AttributeValue::Null(_) => "null",
        types::AttributeValue::S(_) => "string",
        types::AttributeValue::Ss(_) => "string set",
        _ => "unknown",
    }
}

impl<T: Serialize> Predicate<T> {
    fn get_expression(self) -> Result<common::ExpressionInput> {
        let token = get_token(&self.field);
        let placeholder = format!("#{token}");
        let value_placeholder = format!(":{token}");
        let mut expression_attribute_values = collections::HashMap::new();
        let expression = match self.kind {
            PredicateKind::Keyword(value) => {
                let value = get_attribute_value(&self.field, value)?;
                expression_attribute_values.insert(value_placeholder.clone(), value);
                format!("contains({placeholder}, {value_placeholder})")
            }
            PredicateKind::Const(value) => {
                let value = get_attribute_value(&self.field, value)?;
                expression_attribute_values.insert(value_placeholder.clone(), value);
                format!("{placeholder} = {value_placeholder}")
            }
            PredicateKind::Date(range) => {
                let (start, end) = common::split_bounds(&range)?;
                let start_placeholder = format!("{value_placeholder}Start");
                let end_placeholder = format!("{value_placeholder}End");
                let expression =
                    format!("{placeholder} BETWEEN {start_placeholder} AND {end_placeholder}");
                expression_attribute_values.insert(
                    start_placeholder,
                    types::AttributeValue::S(start.to_string()),
                );
                expression_attribute_values
                    .insert(end_placeholder, types::AttributeValue::S(end.to_string()));
                expression
            }
            PredicateKind::Exist => format!("attribute_exists({placeholder})"),
        };
        let operation = common::ExpressionInput {
            expression,
            expression_attribute_names: collections::HashMap::from([(placeholder, self.field)]),
            expression_attribute_values,
        };
        Ok(operation)
    }

    /// Compile predicates into one AND-joined filter expression, in the given order.
    ///
    /// Two predicates binding the same value token to different values fail
    /// with [`Error::PlaceholderCollision`].
    pub fn get_expression_operation(predicates: Vec<Self>) -> Result<common::ExpressionInput> {
        let mut operations = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            operations.push(predicate.get_expression()?);
        }
        common::ExpressionInput::try_merge(&LogicalOperator::And, operations)
    }
}
