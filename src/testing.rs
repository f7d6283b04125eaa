//! In-memory executor for unit tests.

use crate::common::{self, key};
use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::read::{
    self, get_item::GetItemInput, paginate::CancelHandle, query::QueryInput, scan::ScanInput,
};
use crate::write::{
    delete_item::DeleteItemInput, put_item::PutItemInput, update_item::UpdateItemInput,
};

use aws_sdk_dynamodb::types;
use std::{collections, sync};

/// Serves queued pages to queries and scans and records every request.
#[derive(Debug, Default)]
pub(crate) struct MockExecutor {
    cancel_after: Option<(usize, CancelHandle)>,
    failing_deletes: Vec<String>,
    item: Option<common::Item>,
    pages: sync::Mutex<collections::VecDeque<Result<read::common::Page>>>,
    requests: sync::Mutex<Requests>,
}

#[derive(Debug, Default)]
struct Requests {
    deletes: Vec<DeleteItemInput>,
    gets: Vec<GetItemInput>,
    puts: Vec<PutItemInput>,
    queries: Vec<QueryInput>,
    scans: Vec<ScanInput>,
    updates: Vec<UpdateItemInput>,
}

impl MockExecutor {
    pub(crate) fn with_pages(pages: Vec<Result<read::common::Page>>) -> Self {
        Self {
            pages: sync::Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    /// Item returned by point lookups and updates.
    pub(crate) fn with_item(mut self, item: common::Item) -> Self {
        self.item = Some(item);
        self
    }

    /// Trigger `handle` once `pages` pages were served.
    pub(crate) fn cancel_after(mut self, pages: usize, handle: CancelHandle) -> Self {
        self.cancel_after = Some((pages, handle));
        self
    }

    /// Reject deletes of the row whose partition key is `partition_key`.
    pub(crate) fn fail_delete(mut self, partition_key: &str) -> Self {
        self.failing_deletes.push(partition_key.to_string());
        self
    }

    fn requests(&self) -> sync::MutexGuard<'_, Requests> {
        self.requests
            .lock()
            .unwrap_or_else(sync::PoisonError::into_inner)
    }

    fn next_page(&self) -> Result<read::common::Page> {
        let page = self
            .pages
            .lock()
            .unwrap_or_else(sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(read::common::Page::default()));
        let served = {
            let requests = self.requests();
            requests.queries.len() + requests.scans.len()
        };
        if let Some((pages, handle)) = &self.cancel_after {
            if served >= *pages {
                handle.cancel();
            }
        }
        page
    }

    pub(crate) fn deletes(&self) -> Vec<DeleteItemInput> {
        self.requests().deletes.clone()
    }

    pub(crate) fn gets(&self) -> Vec<GetItemInput> {
        self.requests().gets.clone()
    }

    pub(crate) fn puts(&self) -> Vec<PutItemInput> {
        self.requests().puts.clone()
    }

    pub(crate) fn queries(&self) -> Vec<QueryInput> {
        self.requests().queries.clone()
    }

    pub(crate) fn scans(&self) -> Vec<ScanInput> {
        self.requests().scans.clone()
    }

    pub(crate) fn updates(&self) -> Vec<UpdateItemInput> {
        self.requests().updates.clone()
    }
}

impl Execute for MockExecutor {
    async fn query(&self, input: QueryInput) -> Result<read::common::Page> {
        self.requests().queries.push(input);
        self.next_page()
    }

    async fn scan(&self, input: ScanInput) -> Result<read::common::Page> {
        self.requests().scans.push(input);
        self.next_page()
    }

    async fn get_item(&self, input: GetItemInput) -> Result<Option<common::Item>> {
        self.requests().gets.push(input);
        Ok(self.item.clone())
    }

    async fn put_item(&self, input: PutItemInput) -> Result<()> {
        self.requests().puts.push(input);
        Ok(())
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<Option<common::Item>> {
        self.requests().updates.push(input);
        Ok(self.item.clone())
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<()> {
        let rejected = matches!(
            input.keys.get(key::PARTITION_KEY),
            Some(types::AttributeValue::S(partition_key)) if self.failing_deletes.contains(partition_key)
        );
        self.requests().deletes.push(input);
        if rejected {
            return Err(Error::Execute("delete rejected".into()));
        }
        Ok(())
    }
}

/// `PK`/`SK` of the row at `index`.
pub(crate) fn keys(index: usize) -> common::Item {
    common::Item::from([
        (
            key::PARTITION_KEY.to_string(),
            types::AttributeValue::S(format!("P{index}")),
        ),
        (
            key::SORT_KEY.to_string(),
            types::AttributeValue::S(format!("S{index}")),
        ),
    ])
}

/// Row at `index`: its keys plus an `Index` number attribute.
pub(crate) fn item(index: usize) -> common::Item {
    let mut item = keys(index);
    item.insert(
        "Index".to_string(),
        types::AttributeValue::N(index.to_string()),
    );
    item
}

/// Continuation token `{"PK": token}`.
pub(crate) fn token(token: &str) -> common::Item {
    common::Item::from([(
        key::PARTITION_KEY.to_string(),
        types::AttributeValue::S(token.to_string()),
    )])
}

/// Page holding rows `offset..offset + count`, continued by `last_evaluated_key`.
pub(crate) fn page(
    offset: usize,
    count: usize,
    last_evaluated_key: Option<&str>,
) -> Result<read::common::Page> {
    Ok(read::common::Page {
        items: (offset..offset + count).map(item).collect(),
        last_evaluated_key: last_evaluated_key.map(token),
    })
}
