use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::{common, read};

use serde_json::Value;
use std::collections;

/// Compiled primary-index lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItemInput {
    /// `PK` and optional `SK` of the row.
    pub keys: common::Item,
    /// Name placeholders of the projection.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Projection expression restricting the returned attributes.
    pub projection_expression: Option<String>,
    /// The table to read from.
    pub table_name: String,
}

/// Point lookup of a single row.
///
/// Without an index name the row is fetched by its primary key. With one, the
/// index is queried in ascending order and the first match is returned.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_expr::{common, read};
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let get_item = read::get_item::GetItem {
///     key: common::key::Key {
///         partition_key: "USER#1".to_string(),
///         sort_key: Some("PROFILE".to_string()),
///         ..Default::default()
///     },
///     selection: None,
///     table_name: "users".to_string(),
/// };
/// let item = get_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GetItem {
    /// Key of the row; its index name selects the lookup path.
    pub key: common::key::Key,
    /// Which attributes to retrieve; all when `None`.
    pub selection: Option<common::selection::SelectionMap>,
    /// The table to read from.
    pub table_name: String,
}

impl From<GetItem> for GetItemInput {
    fn from(get_item: GetItem) -> Self {
        let keys = common::Item::from(&get_item.key);
        let mut operation = Self {
            keys,
            table_name: get_item.table_name,
            ..Default::default()
        };
        if let Some(selection) = get_item.selection {
            if !selection.is_empty() {
                let selection_operation: common::ExpressionInput = selection.into();
                operation.projection_expression = Some(selection_operation.merge_into(
                    &mut operation.expression_attribute_names,
                    &mut None,
                ));
            }
        }
        operation
    }
}

impl GetItem {
    /// Ascending single-row query on the key's index.
    ///
    /// Without a sort key the `#<index>SK` name is dropped unless the
    /// projection references it, as the store rejects unused names.
    fn into_index_query(self) -> Result<read::query::QueryInput> {
        let unused_sort_key_placeholder = self
            .key
            .sort_key
            .is_none()
            .then(|| format!("#{}", self.key.sort_key_name()));
        let query: read::query::Query<Value> = read::query::Query {
            key: self.key,
            option: read::common::QueryOption {
                scan_index_forward: Some(true),
                page: Some(read::common::PageOption {
                    page_size: Some(1),
                    ..Default::default()
                }),
                ..Default::default()
            },
            selection: self.selection,
            table_name: self.table_name,
        };
        let mut query: read::query::QueryInput = query.try_into()?;
        if let Some(placeholder) = unused_sort_key_placeholder {
            let multiple_read_input = &mut query.multiple_read_input;
            let projected = multiple_read_input
                .projection_expression
                .as_deref()
                .is_some_and(|projection| {
                    projection
                        .split([',', '.', ' '])
                        .any(|token| token == placeholder)
                });
            if !projected {
                if let Some(names) = &mut multiple_read_input.expression_attribute_names {
                    names.remove(&placeholder);
                }
            }
        }
        Ok(query)
    }

    /// Fetch the row, failing with [`Error::NotFound`] when nothing matches.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expr.get_item", skip_all, err)
    )]
    pub async fn send<E: Execute>(self, executor: &E) -> Result<common::Item> {
        let description = serde_json::to_string(&self.key)
            .unwrap_or_else(|_| self.key.partition_key.clone());
        let item = if self.key.index_name.is_some() {
            let query = self.into_index_query()?;
            executor.query(query).await?.items.into_iter().next()
        } else {
            executor.get_item(self.into()).await?
        };
        item.ok_or(Error::NotFound(description))
    }
}
