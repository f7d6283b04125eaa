use crate::common::{self, key};
use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::read;

use serde_json::Value;

/// Compiled delete request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteItemInput {
    /// `PK` and optional `SK` of the row.
    pub keys: common::Item,
    /// The table to delete from.
    pub table_name: String,
}

/// Delete item operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_expr::{common, write};
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let delete_item = write::delete_item::DeleteItem {
///     key: common::key::Key {
///         partition_key: "USER#1".to_string(),
///         sort_key: Some("PROFILE".to_string()),
///         ..Default::default()
///     },
///     table_name: "users".to_string(),
/// };
/// delete_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteItem {
    /// Key of the row to delete.
    pub key: key::Key,
    /// The table to delete from.
    pub table_name: String,
}

impl From<DeleteItem> for DeleteItemInput {
    fn from(delete_item: DeleteItem) -> Self {
        Self {
            keys: common::Item::from(&delete_item.key),
            table_name: delete_item.table_name,
        }
    }
}

impl DeleteItem {
    /// Delete the row.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expr.delete_item", skip_all, err)
    )]
    pub async fn send<E: Execute>(self, executor: &E) -> Result<()> {
        executor.delete_item(self.into()).await
    }
}

/// Result of deleting one row during a bulk delete.
#[derive(Debug)]
pub struct DeleteOutcome {
    /// `PK` and `SK` of the row.
    pub keys: common::Item,
    /// Whether the row was deleted.
    pub result: Result<()>,
}

/// Delete every row of a table, one request per row.
///
/// Row failures are reported in the returned outcomes and do not stop the
/// operation; a failed scan page or a cancellation does. Not atomic.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteAllItems {
    /// The table to empty.
    pub table_name: String,
}

impl DeleteAllItems {
    fn scan(self) -> read::scan::Scan<Value> {
        let selection = common::selection::SelectionMap::Leaves(vec![
            key::PARTITION_KEY.to_string(),
            key::SORT_KEY.to_string(),
        ]);
        read::scan::Scan {
            multiple_read_args: read::common::MultipleReadArgs {
                selection: Some(selection),
                table_name: self.table_name,
                ..Default::default()
            },
        }
    }

    /// Scan the table and delete each row, returning one outcome per row.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expr.delete_all_items", skip_all, err)
    )]
    pub async fn send<E: Execute>(
        self,
        executor: &E,
        cancellation: &read::paginate::Cancellation,
        max_pages: Option<usize>,
    ) -> Result<Vec<DeleteOutcome>> {
        let table_name = self.table_name.clone();
        let mut pager = self
            .scan()
            .into_pager(executor, cancellation.clone())?
            .with_max_pages(max_pages);
        let mut outcomes = Vec::new();
        while let Some(page) = pager.next_page().await {
            for item in page?.items {
                if cancellation.is_canceled() {
                    return Err(Error::Canceled);
                }
                let keys: common::Item = item
                    .into_iter()
                    .filter(|(name, _)| name == key::PARTITION_KEY || name == key::SORT_KEY)
                    .collect();
                let delete_item = DeleteItemInput {
                    keys: keys.clone(),
                    table_name: table_name.clone(),
                };
                let result = executor.delete_item(delete_item).await;
                #[cfg(feature = "tracing")]
                {
                    if let Err(error) = &result {
                        tracing::warn!(?keys, %error, "failed to delete item");
                    }
                }
                outcomes.push(DeleteOutcome { keys, result });
            }
        }
        Ok(outcomes)
    }
}
