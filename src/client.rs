//! Table-bound client.

use crate::common::{self, key::Key, selection::SelectionMap};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::execute::Execute;
use crate::{read, write};

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::from_item;

/// Executes requests against the table named by its [`ClientConfig`].
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_expr::{client::DynamoDbClient, common, config::ClientConfig, read};
/// use serde_json::Value;
///
/// # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
/// let client = DynamoDbClient::new(client, ClientConfig::from_env());
/// let key = common::key::Key {
///     partition_key: "USER#1".to_string(),
///     sort_key: Some("ORDER#".to_string()),
///     ..Default::default()
/// };
/// let orders = client
///     .get_item_list::<Value>(key, None, Default::default(), &Default::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DynamoDbClient<E> {
    config: ClientConfig,
    executor: E,
}

impl<E: Execute> DynamoDbClient<E> {
    /// Bind `executor` to the table of `config`.
    pub fn new(executor: E, config: ClientConfig) -> Self {
        Self { config, executor }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Create or replace a record.
    pub async fn insert<T: Serialize>(&self, item: T) -> Result<()> {
        write::put_item::PutItem {
            item,
            table_name: self.config.table_name.clone(),
        }
        .send(&self.executor)
        .await
    }

    /// Fetch one row, by primary key or through the key's index.
    pub async fn get_item(
        &self,
        key: Key,
        selection: Option<SelectionMap>,
    ) -> Result<common::Item> {
        read::get_item::GetItem {
            key,
            selection,
            table_name: self.config.table_name.clone(),
        }
        .send(&self.executor)
        .await
    }

    /// Fetch one row and hydrate it into `R`.
    pub async fn get_item_as<R: DeserializeOwned>(
        &self,
        key: Key,
        selection: Option<SelectionMap>,
    ) -> Result<R> {
        let item = self.get_item(key, selection).await?;
        Ok(from_item(item)?)
    }

    /// Query the rows matching `key`.
    ///
    /// The configured page size applies when `option` sets none, and the
    /// configured page cap bounds a drain-all query.
    pub async fn get_item_list<T: Serialize + DeserializeOwned>(
        &self,
        key: Key,
        selection: Option<SelectionMap>,
        mut option: read::common::QueryOption<T>,
        cancellation: &read::paginate::Cancellation,
    ) -> Result<read::common::ReadOutput<T>> {
        if let Some(default_page_size) = self.config.default_page_size {
            let page = option.page.get_or_insert_with(Default::default);
            page.page_size.get_or_insert(default_page_size);
        }
        read::query::Query {
            key,
            option,
            selection,
            table_name: self.config.table_name.clone(),
        }
        .send(&self.executor, cancellation, self.config.max_pages)
        .await
    }

    /// Update a row, stamping the last-modified attribute with the current time.
    pub async fn update_item<T: Serialize>(
        &self,
        key: Key,
        fields: write::update_item::UpdateMap<T>,
    ) -> Result<Option<common::Item>> {
        write::update_item::UpdateItem {
            key,
            fields,
            updated_timestamp_field: self.config.updated_timestamp_field.clone(),
            updated_at: Utc::now(),
            table_name: self.config.table_name.clone(),
        }
        .send(&self.executor)
        .await
    }

    /// Update a row from an object using `Fn:<function>:<field>` directive keys.
    pub async fn update_item_with_directives(
        &self,
        key: Key,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<common::Item>> {
        let fields = write::update_item::parse_update_map(fields)?;
        self.update_item(key, fields).await
    }

    /// Delete one row.
    pub async fn delete_item(&self, key: Key) -> Result<()> {
        write::delete_item::DeleteItem {
            key,
            table_name: self.config.table_name.clone(),
        }
        .send(&self.executor)
        .await
    }

    /// Delete every row of the table, reporting one outcome per row.
    pub async fn delete_all_items(
        &self,
        cancellation: &read::paginate::Cancellation,
    ) -> Result<Vec<write::delete_item::DeleteOutcome>> {
        write::delete_item::DeleteAllItems {
            table_name: self.config.table_name.clone(),
        }
        .send(&self.executor, cancellation, self.config.max_pages)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{self, MockExecutor};

    use aws_sdk_dynamodb::types;
    use serde::Deserialize;
    use serde_json::{Value, json};

    fn client(executor: MockExecutor) -> DynamoDbClient<MockExecutor> {
        let config = ClientConfig {
            default_page_size: Some(20),
            max_pages: Some(5),
            ..ClientConfig::new("t")
        };
        DynamoDbClient::new(executor, config)
    }

    fn key() -> Key {
        Key {
            partition_key: "P1".to_string(),
            sort_key: Some("S1".to_string()),
            ..Default::default()
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        #[serde(rename = "PK")]
        partition_key: String,
        #[serde(rename = "Index")]
        index: u32,
    }

    #[tokio::test]
    async fn test_get_item_as() {
        let client = client(MockExecutor::default().with_item(testing::item(1)));
        let actual: Row = client.get_item_as(key(), None).await.unwrap();
        let expected = Row {
            partition_key: "P1".to_string(),
            index: 1,
        };
        assert_eq!(actual, expected);
        assert_eq!(client.executor().gets()[0].table_name, "t");
    }

    #[tokio::test]
    async fn test_get_item_list_applies_default_page_size() {
        let client = client(MockExecutor::with_pages(vec![testing::page(0, 2, None)]));
        let actual = client
            .get_item_list::<Value>(key(), None, Default::default(), &Default::default())
            .await
            .unwrap();
        assert_eq!(actual.items.len(), 2);
        assert_eq!(actual.continuation_token, None);
        let queries = client.executor().queries();
        assert_eq!(queries[0].multiple_read_input.limit, Some(20));
        assert_eq!(queries[0].scan_index_forward, Some(false));
    }

    #[tokio::test]
    async fn test_get_item_list_keeps_caller_page_size() {
        let client = client(MockExecutor::with_pages(vec![testing::page(0, 1, None)]));
        let option = read::common::QueryOption::<Value> {
            page: Some(read::common::PageOption {
                page_size: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        client
            .get_item_list(key(), None, option, &Default::default())
            .await
            .unwrap();
        assert_eq!(
            client.executor().queries()[0].multiple_read_input.limit,
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_update_item_stamps_timestamp() {
        let client = client(MockExecutor::default());
        let fields = json!({"Name": "Jane", "Fn:increase:Visits": 1});
        client
            .update_item_with_directives(key(), fields.as_object().cloned().unwrap_or_default())
            .await
            .unwrap();
        let updates = client.executor().updates();
        assert_eq!(
            updates[0].update_expression,
            "SET #Visits = if_not_exists(#Visits, :_Zero) + :Visits, #Name = :Name, #UpdatedTimestamp = :UpdatedTimestamp"
        );
        let values = updates[0].expression_attribute_values.clone().unwrap_or_default();
        assert!(matches!(
            values.get(":UpdatedTimestamp"),
            Some(types::AttributeValue::S(timestamp)) if timestamp.ends_with('Z')
        ));
    }

    #[tokio::test]
    async fn test_update_item_with_malformed_directive() {
        let client = client(MockExecutor::default());
        let fields = json!({"Fn:increase": 1});
        let actual = client
            .update_item_with_directives(key(), fields.as_object().cloned().unwrap_or_default())
            .await;
        assert!(matches!(actual, Err(Error::MalformedFunctionDirective(_))));
        assert!(client.executor().updates().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_delete() {
        let client = client(MockExecutor::default());
        client.insert(json!({"PK": "P1", "SK": "S1"})).await.unwrap();
        client.delete_item(key()).await.unwrap();
        assert_eq!(client.executor().puts().len(), 1);
        assert_eq!(client.executor().deletes()[0].keys, testing::keys(1));
    }

    #[tokio::test]
    async fn test_delete_all_items_uses_page_cap() {
        let pages = (0..6)
            .map(|page| testing::page(page, 1, Some("t")))
            .collect();
        let client = client(MockExecutor::with_pages(pages));
        let actual = client.delete_all_items(&Default::default()).await;
        assert!(matches!(actual, Err(Error::PageLimitExceeded { max: 5 })));
        assert_eq!(client.executor().deletes().len(), 5);
    }
}
