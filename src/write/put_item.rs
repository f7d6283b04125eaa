use crate::common;
use crate::error::{Error, Result};
use crate::execute::Execute;

use serde::Serialize;
use serde_dynamo::to_item;

/// Compiled put request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutItemInput {
    /// The marshaled record.
    pub item: common::Item,
    /// The table to write to.
    pub table_name: String,
}

/// Put item operation, creating or replacing a whole record.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_expr::write;
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let put_item = write::put_item::PutItem {
///     item: json!({"PK": "USER#1", "SK": "PROFILE", "Name": "Jane"}),
///     table_name: "users".to_string(),
/// };
/// put_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutItem<T> {
    /// The record; must marshal to a map.
    pub item: T,
    /// The table to write to.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<PutItem<T>> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<T>) -> Result<Self> {
        let item = to_item(put_item.item)?;
        Ok(Self {
            item,
            table_name: put_item.table_name,
        })
    }
}

impl<T: Serialize> PutItem<T> {
    /// Write the record.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expr.put_item", skip_all, err)
    )]
    pub async fn send<E: Execute>(self, executor: &E) -> Result<()> {
        let put_item: PutItemInput = self.try_into()?;
        executor.put_item(put_item).await
    }
}
