use crate::common::{self, operator::SortKeyOperator};
use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::{Deserialize, Serialize};
use std::collections;

/// Attribute name suffix of a partition key (`PK`, `GSI1PK`, ...).
pub const PARTITION_KEY: &str = "PK";

/// Attribute name suffix of a sort key (`SK`, `GSI1SK`, ...).
pub const SORT_KEY: &str = "SK";

const PARTITION_KEY_VALUE: &str = ":gsipk";
const SORT_KEY_VALUE: &str = ":gsisk";
const SORT_KEY_BEGIN_VALUE: &str = ":gsiskBegin";
const SORT_KEY_END_VALUE: &str = ":gsiskEnd";

/// Addressing descriptor for one row or one query scope.
///
/// ```rust
/// use dynamodb_expr::common::{key, operator};
///
/// let key = key::Key {
///     partition_key: "USER#1".to_string(),
///     sort_key: Some("ORDER#2024-01/2024-06".to_string()),
///     index_name: Some("GSI1".to_string()),
///     sort_key_operator: Some(operator::SortKeyOperator::Between),
/// };
/// let condition = key.key_condition().unwrap();
/// assert_eq!(
///     condition.expression,
///     "#GSI1PK = :gsipk AND #GSI1SK BETWEEN :gsiskBegin AND :gsiskEnd"
/// );
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Key {
    /// The partition key value.
    #[serde(rename = "PK")]
    pub partition_key: String,
    /// The sort key value, if any.
    #[serde(default, rename = "SK", skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// The secondary index to address; `None` addresses the primary index.
    #[serde(default, rename = "IndexName", skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// The sort key comparison; inferred from the sort key when `None`.
    #[serde(default, rename = "SortKeyType", skip_serializing_if = "Option::is_none")]
    pub sort_key_operator: Option<SortKeyOperator>,
}

impl Key {
    /// Attribute name of the partition key for the addressed index.
    pub fn partition_key_name(&self) -> String {
        format!("{}{PARTITION_KEY}", self.index_name.as_deref().unwrap_or_default())
    }

    /// Attribute name of the sort key for the addressed index.
    pub fn sort_key_name(&self) -> String {
        format!("{}{SORT_KEY}", self.index_name.as_deref().unwrap_or_default())
    }

    /// The explicit sort key operator, or the inferred one.
    ///
    /// A sort key ending with the key separator is a prefix (`begins_with`),
    /// anything else is an exact match.
    pub fn resolved_operator(&self) -> SortKeyOperator {
        match (self.sort_key_operator, &self.sort_key) {
            (Some(operator), _) => operator,
            (None, Some(sort_key)) if sort_key.ends_with(common::KEY_SEPARATOR) => {
                SortKeyOperator::BeginsWith
            }
            (None, _) => SortKeyOperator::Equals,
        }
    }

    /// Compile the key-condition expression for this key.
    ///
    /// Both the partition and sort key name placeholders are always registered.
    pub fn key_condition(&self) -> Result<common::ExpressionInput> {
        let partition_key_name = self.partition_key_name();
        let sort_key_name = self.sort_key_name();
        let partition_key_placeholder = format!("#{partition_key_name}");
        let sort_key_placeholder = format!("#{sort_key_name}");
        let mut expressions = vec![format!(
            "{partition_key_placeholder} = {PARTITION_KEY_VALUE}"
        )];
        let mut expression_attribute_values = collections::HashMap::from([(
            PARTITION_KEY_VALUE.to_string(),
            types::AttributeValue::S(self.partition_key.clone()),
        )]);
        if let Some(sort_key) = &self.sort_key {
            let expression = match self.resolved_operator() {
                SortKeyOperator::Between => {
                    let (begin, end) = split_sort_key_range(sort_key)?;
                    expression_attribute_values.insert(
                        SORT_KEY_BEGIN_VALUE.to_string(),
                        types::AttributeValue::S(begin),
                    );
                    expression_attribute_values
                        .insert(SORT_KEY_END_VALUE.to_string(), types::AttributeValue::S(end));
                    format!(
                        "{sort_key_placeholder} BETWEEN {SORT_KEY_BEGIN_VALUE} AND {SORT_KEY_END_VALUE}"
                    )
                }
                SortKeyOperator::BeginsWith => {
                    expression_attribute_values.insert(
                        SORT_KEY_VALUE.to_string(),
                        types::AttributeValue::S(sort_key.clone()),
                    );
                    format!("begins_with({sort_key_placeholder}, {SORT_KEY_VALUE})")
                }
                operator => {
                    expression_attribute_values.insert(
                        SORT_KEY_VALUE.to_string(),
                        types::AttributeValue::S(sort_key.clone()),
                    );
                    format!("{sort_key_placeholder} {} {SORT_KEY_VALUE}", &*operator)
                }
            };
            expressions.push(expression);
        }
        let expression_attribute_names = collections::HashMap::from([
            (partition_key_placeholder, partition_key_name),
            (sort_key_placeholder, sort_key_name),
        ]);
        let operation = common::ExpressionInput {
            expression: expressions.join(" AND "),
            expression_attribute_names,
            expression_attribute_values,
        };
        Ok(operation)
    }
}

/// Split `<prefix>#<low>/<high>` into `<prefix>#<low>` and `<prefix>#<high>`.
///
/// A value without a key separator has no prefix and yields the bare bounds.
pub fn split_sort_key_range(sort_key: &str) -> Result<(String, String)> {
    match sort_key.rsplit_once(common::KEY_SEPARATOR) {
        Some((prefix, bounds)) => {
            let (low, high) = common::split_bounds(bounds)
                .map_err(|_| Error::MalformedRange(sort_key.to_string()))?;
            let separator = common::KEY_SEPARATOR;
            Ok((
                format!("{prefix}{separator}{low}"),
                format!("{prefix}{separator}{high}"),
            ))
        }
        None => {
            let (low, high) = common::split_bounds(sort_key)?;
            Ok((low.to_string(), high.to_string()))
        }
    }
}

impl From<&Key> for common::Item {
    fn from(key: &Key) -> Self {
        let mut keys = Self::from([(
            PARTITION_KEY.to_string(),
            types::AttributeValue::S(key.partition_key.clone()),
        )]);
        if let Some(sort_key) = &key.sort_key {
            keys.insert(
                SORT_KEY.to_string(),
                types::AttributeValue::S(sort_key.clone()),
            );
        }
        keys
    }
}
