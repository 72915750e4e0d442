//! Paginated stream for lazy iteration over API results.
//!
//! List endpoints return one page at a time and advertise the following page
//! in an RFC 5988 `Link` header (`<url>; rel="next"`). [`PaginatedStream`]
//! yields individual records and only requests the next page once the
//! current one is exhausted, so a consumer that stops early never triggers
//! another request.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::error_info::check_status;
use super::ClientInner;
use crate::Result;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Borrowed record filter.
pub type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Page size to request for a given `limit` (0 for no limit).
///
/// Asks for half again as many records as needed, to leave headroom for
/// client-side filtering, capped at `max`.
///
/// ```
/// use hub_rs::client::paginated::per_page;
///
/// assert_eq!(per_page(10, 100), 15);
/// assert_eq!(per_page(80, 100), 100);
/// assert_eq!(per_page(0, 100), 100);
/// ```
pub fn per_page(limit: usize, max: usize) -> usize {
    if limit > 0 {
        let wanted = limit.saturating_add(limit / 2);
        if wanted < max {
            return wanted;
        }
    }
    max
}

/// One page of records plus the link to the next page.
#[derive(Debug)]
pub struct Page<T> {
    /// Records in server order
    pub items: Vec<T>,
    /// URL of the next page, if any
    pub next: Option<String>,
}

/// Type alias for a boxed future used internally.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type PageFetcher<T> = Box<dyn Fn(String) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync>;

/// A stream that lazily fetches pages by following `next` links.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
/// use hub_rs::Project;
///
/// # async fn example(client: hub_rs::HubClient) -> hub_rs::Result<()> {
/// let project = Project::new("rust-lang", "rust");
/// let mut stream = client.pulls().stream(&project, &Default::default(), 0);
///
/// while let Some(result) = stream.next().await {
///     let pull = result?;
///     println!("#{} {}", pull.number, pull.title);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PaginatedStream<T> {
    /// Function to fetch a page by URL.
    fetch_page: PageFetcher<T>,
    /// Records of the current page not yet yielded.
    current_items: VecDeque<T>,
    /// Next page to fetch, `None` once exhausted.
    next_url: Option<String>,
    /// Current in-flight fetch future.
    pending_fetch: Option<BoxFuture<'static, Result<Page<T>>>>,
}

impl<T> PaginatedStream<T>
where
    T: Send + 'static,
{
    /// Create a stream starting at `start`.
    pub fn new<F>(start: impl Into<String>, fetch_page: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<Page<T>>> + Send + Sync + 'static,
    {
        Self {
            fetch_page: Box::new(fetch_page),
            current_items: VecDeque::new(),
            next_url: Some(start.into()),
            pending_fetch: None,
        }
    }

    /// Drain the stream into a vector.
    ///
    /// Keeps records accepted by `predicate` (all records when `None`) and
    /// stops as soon as `limit` records have been kept. A `limit` of 0 means
    /// no limit.
    pub async fn collect_limited(
        mut self,
        limit: usize,
        predicate: Option<Predicate<'_, T>>,
    ) -> Result<Vec<T>> {
        let mut records = Vec::new();
        if limit > 0 {
            records.reserve(limit.min(MAX_PAGE_SIZE));
        }

        while let Some(item) = self.next().await {
            let item = item?;
            if predicate.map_or(true, |keep| keep(&item)) {
                records.push(item);
                if limit > 0 && records.len() >= limit {
                    break;
                }
            }
        }
        Ok(records)
    }
}

impl<T> Stream for PaginatedStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(item) = this.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if let Some(ref mut fut) = this.pending_fetch {
                match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.pending_fetch = None;
                        this.current_items = page.items.into();
                        this.next_url = page.next;
                        // An empty page still may link to a later one.
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.pending_fetch = None;
                        this.next_url = None;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            if let Some(url) = this.next_url.take() {
                this.pending_fetch = Some((this.fetch_page)(url));
                continue;
            }

            return Poll::Ready(None);
        }
    }
}

impl<T> Unpin for PaginatedStream<T> {}

/// Builder for streams over JSON array endpoints.
pub(crate) struct PaginatedStreamBuilder<T> {
    inner: Arc<ClientInner>,
    path: String,
    action: String,
    accept: Option<&'static str>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned + Send + 'static> PaginatedStreamBuilder<T> {
    /// Create a new builder; `action` names the operation in errors.
    pub(crate) fn new(inner: Arc<ClientInner>, path: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            inner,
            path: path.into(),
            action: action.into(),
            accept: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Request a specific media type for every page.
    pub(crate) fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }

    /// Build the stream.
    pub(crate) fn build(self) -> PaginatedStream<T> {
        let inner = self.inner;
        let action = self.action;
        let accept = self.accept;

        PaginatedStream::new(self.path, move |url: String| {
            let inner = inner.clone();
            let action = action.clone();

            Box::pin(async move {
                let result = match accept {
                    Some(media_type) => inner.get_file(&url, media_type).await,
                    None => inner.get(&url).await,
                };
                let response = check_status(StatusCode::OK, &action, result).await?;
                let next = response.link("next");
                let items: Vec<T> = response.json().await?;
                Ok(Page { items, next })
            })
        })
    }
}
