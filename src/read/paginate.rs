use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::{common, read};

use std::future::{self, Future};
use tokio::{sync::watch, time};

/// Signal that stops a sequence of page fetches.
///
/// A cancellation is triggered through its [`CancelHandle`] or when its
/// deadline elapses. The default value never cancels.
///
/// ```rust
/// use dynamodb_expr::read::paginate::Cancellation;
///
/// let (handle, cancellation) = Cancellation::pair();
/// assert!(!cancellation.is_canceled());
/// handle.cancel();
/// assert!(cancellation.is_canceled());
/// ```
#[derive(Clone, Debug)]
pub struct Cancellation {
    receiver: watch::Receiver<bool>,
    deadline: Option<time::Instant>,
}

/// Triggers the [`Cancellation`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every request guarded by the paired cancellation.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        let (_, receiver) = watch::channel(false);
        Self {
            receiver,
            deadline: None,
        }
    }
}

impl Cancellation {
    /// Create a cancellation and the handle that triggers it.
    pub fn pair() -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        let cancellation = Self {
            receiver,
            deadline: None,
        };
        (CancelHandle { sender }, cancellation)
    }

    /// Also cancel once `deadline` is reached.
    pub fn with_deadline(mut self, deadline: time::Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the cancellation was triggered or its deadline elapsed.
    pub fn is_canceled(&self) -> bool {
        *self.receiver.borrow()
            || self
                .deadline
                .is_some_and(|deadline| time::Instant::now() >= deadline)
    }

    /// Run `operation` unless canceled first.
    pub async fn guard<F, O>(&self, operation: F) -> Result<O>
    where
        F: Future<Output = Result<O>>,
    {
        if self.is_canceled() {
            return Err(Error::Canceled);
        }
        let mut receiver = self.receiver.clone();
        let canceled = async move {
            let closed = receiver.wait_for(|canceled| *canceled).await.is_err();
            if closed {
                // the handle is gone: this signal can no longer fire
                future::pending::<()>().await;
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = canceled => Err(Error::Canceled),
            () = deadline => Err(Error::Canceled),
            output = operation => output,
        }
    }
}

/// A compiled request that can be paged through.
#[derive(Clone, Debug, PartialEq)]
pub enum PageRequest {
    /// Query request.
    Query(read::query::QueryInput),
    /// Scan request.
    Scan(read::scan::ScanInput),
}

impl PageRequest {
    fn set_exclusive_start_key(&mut self, exclusive_start_key: Option<common::Item>) {
        let multiple_read_input = match self {
            Self::Query(query) => &mut query.multiple_read_input,
            Self::Scan(scan) => &mut scan.multiple_read_input,
        };
        multiple_read_input.exclusive_start_key = exclusive_start_key;
    }

    async fn execute<E: Execute>(&self, executor: &E) -> Result<read::common::Page> {
        match self.clone() {
            Self::Query(query) => executor.query(query).await,
            Self::Scan(scan) => executor.scan(scan).await,
        }
    }
}

/// Lazy, finite sequence of pages.
///
/// Each call to [`Pager::next_page`] issues the same request with the
/// continuation token of the previous page; the sequence ends after the page
/// that carries no token. Pages are fetched strictly one after another.
pub struct Pager<'a, E> {
    cancellation: Cancellation,
    executor: &'a E,
    fetched: usize,
    finished: bool,
    max_pages: Option<usize>,
    request: PageRequest,
}

impl<'a, E: Execute> Pager<'a, E> {
    /// Page through `request`, starting from its own continuation token.
    pub fn new(executor: &'a E, request: PageRequest, cancellation: Cancellation) -> Self {
        Self {
            cancellation,
            executor,
            fetched: 0,
            finished: false,
            max_pages: None,
            request,
        }
    }

    /// Fail with [`Error::PageLimitExceeded`] instead of fetching more than `max_pages` pages.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Number of pages fetched so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Fetch the next page, or `None` once the final page was returned.
    ///
    /// The sequence also ends after the first error.
    pub async fn next_page(&mut self) -> Option<Result<read::common::Page>> {
        if self.finished {
            return None;
        }
        if let Some(max) = self.max_pages {
            if self.fetched >= max {
                self.finished = true;
                return Some(Err(Error::PageLimitExceeded { max }));
            }
        }
        let page = match self
            .cancellation
            .guard(self.request.execute(self.executor))
            .await
        {
            Ok(page) => page,
            Err(error) => {
                self.finished = true;
                return Some(Err(error));
            }
        };
        self.fetched += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            page = self.fetched,
            items = page.items.len(),
            more = page.last_evaluated_key.is_some(),
            "fetched page"
        );
        match &page.last_evaluated_key {
            Some(last_evaluated_key) => self
                .request
                .set_exclusive_start_key(Some(last_evaluated_key.clone())),
            None => self.finished = true,
        }
        Some(Ok(page))
    }

    /// Drain every remaining page and return all of their rows.
    pub async fn collect_items(mut self) -> Result<Vec<common::Item>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }
}
