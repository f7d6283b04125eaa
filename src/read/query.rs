use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::{common, read};

use serde::{Serialize, de::DeserializeOwned};

/// Compiled query request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryInput {
    /// Key-condition expression.
    pub key_condition_expression: String,
    /// Filter, projection, paging and placeholder tables.
    pub multiple_read_input: read::common::MultipleReadInput,
    /// Sort direction.
    pub scan_index_forward: Option<bool>,
}

/// Query operation.
///
/// ```rust
/// use dynamodb_expr::{common, read};
/// use serde_json::Value;
///
/// let query: read::query::Query<Value> = read::query::Query {
///     key: common::key::Key {
///         partition_key: "USER#1".to_string(),
///         sort_key: Some("ORDER#".to_string()),
///         ..Default::default()
///     },
///     selection: Some("Id,Total".parse().unwrap()),
///     option: Default::default(),
///     table_name: "orders".to_string(),
/// };
/// let input: read::query::QueryInput = query.try_into().unwrap();
/// assert_eq!(
///     input.key_condition_expression,
///     "#PK = :gsipk AND begins_with(#SK, :gsisk)"
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Query<T> {
    /// Partition key, sort key condition and index of the query.
    pub key: common::key::Key,
    /// Filter, sort direction and paging.
    pub option: read::common::QueryOption<T>,
    /// Which attributes to retrieve; all when `None`.
    pub selection: Option<common::selection::SelectionMap>,
    /// The table to query.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<Query<T>> for QueryInput {
    type Error = Error;

    fn try_from(query: Query<T>) -> Result<Self> {
        let key_condition_operation = query.key.key_condition()?;
        let page = query.option.page.unwrap_or_default();
        let multiple_read_args = read::common::MultipleReadArgs {
            exclusive_start_key: page.continuation_token,
            filter: query.option.filter,
            index_name: query.key.index_name,
            limit: page.page_size,
            selection: query.selection,
            table_name: query.table_name,
        };
        let mut multiple_read_input: read::common::MultipleReadInput =
            multiple_read_args.try_into()?;
        let key_condition_expression = key_condition_operation.try_merge_into(
            &mut multiple_read_input.expression_attribute_names,
            &mut multiple_read_input.expression_attribute_values,
        )?;
        let operation = Self {
            key_condition_expression,
            multiple_read_input,
            scan_index_forward: Some(query.option.scan_index_forward.unwrap_or(false)),
        };
        Ok(operation)
    }
}

impl<T: Serialize> Query<T> {
    /// Compile the query into a lazy page sequence.
    pub fn into_pager<E: Execute>(
        self,
        executor: &E,
        cancellation: read::paginate::Cancellation,
    ) -> Result<read::paginate::Pager<'_, E>> {
        let query: QueryInput = self.try_into()?;
        let request = read::paginate::PageRequest::Query(query);
        Ok(read::paginate::Pager::new(executor, request, cancellation))
    }
}

impl<T: Serialize + DeserializeOwned> Query<T> {
    /// Execute the query.
    ///
    /// Without drain-all a single page is fetched and its continuation token
    /// returned. With drain-all every page is fetched and the token is `None`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_expr.query", skip_all, err)
    )]
    pub async fn send<E: Execute>(
        self,
        executor: &E,
        cancellation: &read::paginate::Cancellation,
        max_pages: Option<usize>,
    ) -> Result<read::common::ReadOutput<T>> {
        let drain_all = self
            .option
            .page
            .as_ref()
            .is_some_and(|page| page.drain_all);
        let mut pager = self
            .into_pager(executor, cancellation.clone())?
            .with_max_pages(max_pages);
        if drain_all {
            let items = pager.collect_items().await?;
            return Ok(read::common::ReadOutput {
                items,
                continuation_token: None,
            });
        }
        let page = match pager.next_page().await {
            Some(page) => page?,
            None => read::common::Page::default(),
        };
        let continuation_token = page
            .last_evaluated_key
            .map(read::common::get_continuation_token)
            .transpose()?;
        Ok(read::common::ReadOutput {
            items: page.items,
            continuation_token,
        })
    }
}
