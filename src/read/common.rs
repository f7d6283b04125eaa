use crate::common;
use crate::error::{Error, Result};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_dynamo::{from_attribute_value, to_attribute_value};
use std::collections;

/// Compiled parameters shared by Query and Scan requests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadInput {
    /// Continuation token to resume from.
    pub exclusive_start_key: Option<common::Item>,
    /// Name placeholders for every expression of the request.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Value placeholders for every expression of the request.
    pub expression_attribute_values: Option<common::Item>,
    /// Filter expression applied after key matching.
    pub filter_expression: Option<String>,
    /// Secondary index to read from.
    pub index_name: Option<String>,
    /// Maximum number of rows evaluated per page.
    pub limit: Option<i32>,
    /// Projection expression restricting the returned attributes.
    pub projection_expression: Option<String>,
    /// The table to read from.
    pub table_name: String,
}

/// Arguments for multiple-item reads (Query, Scan).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadArgs<T> {
    /// Continuation token to resume from.
    pub exclusive_start_key: Option<collections::HashMap<String, T>>,
    /// Filter predicates, AND-joined in order.
    pub filter: Vec<common::condition::Predicate<T>>,
    /// Secondary index to read from.
    pub index_name: Option<String>,
    /// Maximum number of rows evaluated per page.
    pub limit: Option<i32>,
    /// Which attributes to retrieve.
    pub selection: Option<common::selection::SelectionMap>,
    /// The table to read from.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<MultipleReadArgs<T>> for MultipleReadInput {
    type Error = Error;

    fn try_from(multiple_read_args: MultipleReadArgs<T>) -> Result<Self> {
        let exclusive_start_key = match multiple_read_args.exclusive_start_key {
            Some(exclusive_start_key) if !exclusive_start_key.is_empty() => {
                let mut serialized_exclusive_start_key =
                    collections::HashMap::with_capacity(exclusive_start_key.len());
                for (key, value) in exclusive_start_key {
                    let value = to_attribute_value(value)?;
                    serialized_exclusive_start_key.insert(key, value);
                }
                Some(serialized_exclusive_start_key)
            }
            _ => None,
        };
        let mut operation = Self {
            exclusive_start_key,
            index_name: multiple_read_args.index_name,
            limit: multiple_read_args.limit,
            table_name: multiple_read_args.table_name,
            ..Default::default()
        };
        if !multiple_read_args.filter.is_empty() {
            let filter_operation =
                common::condition::Predicate::get_expression_operation(multiple_read_args.filter)?;
            operation.filter_expression = Some(filter_operation.try_merge_into(
                &mut operation.expression_attribute_names,
                &mut operation.expression_attribute_values,
            )?);
        }
        if let Some(selection) = multiple_read_args.selection {
            if !selection.is_empty() {
                let selection_operation: common::ExpressionInput = selection.into();
                operation.projection_expression = Some(selection_operation.merge_into(
                    &mut operation.expression_attribute_names,
                    &mut operation.expression_attribute_values,
                ));
            }
        }
        Ok(operation)
    }
}

/// Page size, continuation token and drain-all switch of a read.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PageOption<T> {
    /// Keep fetching until the store reports no continuation token.
    ///
    /// When set, the returned continuation token is always empty.
    #[serde(default, rename = "allInOne")]
    pub drain_all: bool,
    /// Maximum number of rows evaluated per page.
    #[serde(default, rename = "pageSize")]
    pub page_size: Option<i32>,
    /// Continuation token returned by a previous read.
    #[serde(default, rename = "lastEvaluatedKey")]
    pub continuation_token: Option<collections::HashMap<String, T>>,
}

impl<T> Default for PageOption<T> {
    fn default() -> Self {
        Self {
            drain_all: false,
            page_size: None,
            continuation_token: None,
        }
    }
}

/// Read-path parameters of a query.
///
/// ```rust
/// use dynamodb_expr::{common, read};
/// use serde_json::Value;
///
/// let option: read::common::QueryOption<Value> = serde_json::from_str(
///     r#"{
///         "filter": [{"field": "Status", "type": "const", "keyword": "active"}],
///         "page": {"allInOne": true, "pageSize": 100}
///     }"#,
/// )
/// .unwrap();
/// assert!(option.page.unwrap().drain_all);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QueryOption<T> {
    /// Filter predicates, AND-joined in order.
    #[serde(default)]
    pub filter: Vec<common::condition::Predicate<T>>,
    /// Sort direction; descending when `None`.
    #[serde(default, rename = "scanIndexForward")]
    pub scan_index_forward: Option<bool>,
    /// Pagination settings.
    #[serde(default)]
    pub page: Option<PageOption<T>>,
}

impl<T> Default for QueryOption<T> {
    fn default() -> Self {
        Self {
            filter: Vec::new(),
            scan_index_forward: None,
            page: None,
        }
    }
}

/// One page of rows returned by the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The rows of the page.
    pub items: Vec<common::Item>,
    /// Continuation token; `None` on the final page.
    pub last_evaluated_key: Option<common::Item>,
}

/// Rows of a read plus the token to resume it.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOutput<T> {
    /// The accumulated rows.
    pub items: Vec<common::Item>,
    /// Continuation token; `None` once every page was consumed.
    pub continuation_token: Option<collections::HashMap<String, T>>,
}

/// Unmarshal a store continuation token into caller values.
pub(crate) fn get_continuation_token<T: DeserializeOwned>(
    last_evaluated_key: common::Item,
) -> Result<collections::HashMap<String, T>> {
    let mut continuation_token = collections::HashMap::with_capacity(last_evaluated_key.len());
    for (key, value) in last_evaluated_key {
        let value = from_attribute_value(value)?;
        continuation_token.insert(key, value);
    }
    Ok(continuation_token)
}

/// apply compiled multiple read settings to a Query or Scan builder
#[macro_export]
macro_rules! apply_multiple_read_input {
    ($builder:expr, $multiple_read_input:expr) => {
        $builder
            .set_exclusive_start_key($multiple_read_input.exclusive_start_key)
            .set_expression_attribute_names($multiple_read_input.expression_attribute_names)
            .set_expression_attribute_values($multiple_read_input.expression_attribute_values)
            .set_filter_expression($multiple_read_input.filter_expression)
            .set_index_name($multiple_read_input.index_name)
            .set_limit($multiple_read_input.limit)
            .set_projection_expression($multiple_read_input.projection_expression)
            .table_name($multiple_read_input.table_name)
    };
}
