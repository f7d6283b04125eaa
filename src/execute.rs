//! The seam between compiled requests and the store.
//!
//! [`Execute`] takes the compiled input structs and returns raw rows. It is
//! implemented for [`aws_sdk_dynamodb::Client`]; tests substitute an in-memory
//! executor.

use crate::common;
use crate::error::{Error, Result};
use crate::read::{self, get_item::GetItemInput, query::QueryInput, scan::ScanInput};
use crate::write::{
    delete_item::DeleteItemInput, put_item::PutItemInput, update_item::UpdateItemInput,
};

use aws_sdk_dynamodb::{Client, types};
use std::future::Future;

/// Sends compiled requests to the store.
///
/// Implementations perform exactly one store call per method and never retry.
pub trait Execute: Send + Sync {
    /// Fetch one page of a query.
    fn query(&self, input: QueryInput) -> impl Future<Output = Result<read::common::Page>> + Send;

    /// Fetch one page of a scan.
    fn scan(&self, input: ScanInput) -> impl Future<Output = Result<read::common::Page>> + Send;

    /// Fetch a row by primary key.
    fn get_item(
        &self,
        input: GetItemInput,
    ) -> impl Future<Output = Result<Option<common::Item>>> + Send;

    /// Create or replace a row.
    fn put_item(&self, input: PutItemInput) -> impl Future<Output = Result<()>> + Send;

    /// Update a row and return its updated attributes.
    fn update_item(
        &self,
        input: UpdateItemInput,
    ) -> impl Future<Output = Result<Option<common::Item>>> + Send;

    /// Delete a row.
    fn delete_item(&self, input: DeleteItemInput) -> impl Future<Output = Result<()>> + Send;
}

fn get_execute_error<E>(error: E) -> Error
where
    aws_sdk_dynamodb::Error: From<E>,
{
    Error::Execute(Box::new(aws_sdk_dynamodb::Error::from(error)))
}

fn get_page(
    items: Option<Vec<common::Item>>,
    last_evaluated_key: Option<common::Item>,
) -> read::common::Page {
    read::common::Page {
        items: items.unwrap_or_default(),
        last_evaluated_key: last_evaluated_key.filter(|key| !key.is_empty()),
    }
}

impl Execute for Client {
    async fn query(&self, input: QueryInput) -> Result<read::common::Page> {
        let builder = Client::query(self)
            .key_condition_expression(input.key_condition_expression)
            .set_scan_index_forward(input.scan_index_forward);
        let output = crate::apply_multiple_read_input!(builder, input.multiple_read_input)
            .send()
            .await
            .map_err(get_execute_error)?;
        Ok(get_page(output.items, output.last_evaluated_key))
    }

    async fn scan(&self, input: ScanInput) -> Result<read::common::Page> {
        let builder = Client::scan(self);
        let output = crate::apply_multiple_read_input!(builder, input.multiple_read_input)
            .send()
            .await
            .map_err(get_execute_error)?;
        Ok(get_page(output.items, output.last_evaluated_key))
    }

    async fn get_item(&self, input: GetItemInput) -> Result<Option<common::Item>> {
        let output = Client::get_item(self)
            .set_key(Some(input.keys))
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_projection_expression(input.projection_expression)
            .table_name(input.table_name)
            .send()
            .await
            .map_err(get_execute_error)?;
        Ok(output.item)
    }

    async fn put_item(&self, input: PutItemInput) -> Result<()> {
        Client::put_item(self)
            .set_item(Some(input.item))
            .table_name(input.table_name)
            .send()
            .await
            .map_err(get_execute_error)?;
        Ok(())
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<Option<common::Item>> {
        let output = Client::update_item(self)
            .set_key(Some(input.keys))
            .update_expression(input.update_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .return_values(types::ReturnValue::UpdatedNew)
            .table_name(input.table_name)
            .send()
            .await
            .map_err(get_execute_error)?;
        Ok(output.attributes)
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<()> {
        Client::delete_item(self)
            .set_key(Some(input.keys))
            .table_name(input.table_name)
            .send()
            .await
            .map_err(get_execute_error)?;
        Ok(())
    }
}
