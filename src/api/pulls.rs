//! Pull requests service.

use std::collections::BTreeMap;
use std::sync::Arc;

use url::form_urlencoded;

use crate::client::paginated::PaginatedStreamBuilder;
use crate::client::{per_page, ClientInner, PaginatedStream, Predicate, DRAFTS_MEDIA_TYPE, MAX_PAGE_SIZE};
use crate::models::{Project, PullRequest};
use crate::Result;

const FETCH_ACTION: &str = "fetching pull requests";

/// Service for pull request operations.
///
/// # Example
///
/// ```no_run
/// use std::collections::BTreeMap;
/// use hub_rs::{Project, PullRequest};
///
/// # async fn example(client: hub_rs::HubClient) -> hub_rs::Result<()> {
/// let project = Project::new("rust-lang", "rust");
/// let mut filter = BTreeMap::new();
/// filter.insert("state".to_string(), "open".to_string());
///
/// // First 20 open pull requests that are not drafts
/// let ready = |pr: &PullRequest| !pr.draft;
/// let pulls = client.pulls().fetch(&project, &filter, 20, Some(&ready)).await?;
/// # Ok(())
/// # }
/// ```
pub struct PullsService {
    inner: Arc<ClientInner>,
}

impl PullsService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// List pull requests of `project`, following pagination.
    ///
    /// `filter` is sent as query parameters (`state`, `head`, `base`,
    /// `sort`, ...). At most `limit` records accepted by `predicate` are
    /// returned; a `limit` of 0 returns every matching record.
    pub async fn fetch(
        &self,
        project: &Project,
        filter: &BTreeMap<String, String>,
        limit: usize,
        predicate: Option<Predicate<'_, PullRequest>>,
    ) -> Result<Vec<PullRequest>> {
        self.stream(project, filter, limit)
            .collect_limited(limit, predicate)
            .await
    }

    /// Lazily stream pull requests of `project`.
    ///
    /// `limit` only sizes the pages requested; the stream itself runs until
    /// the last page.
    pub fn stream(
        &self,
        project: &Project,
        filter: &BTreeMap<String, String>,
        limit: usize,
    ) -> PaginatedStream<PullRequest> {
        PaginatedStreamBuilder::new(self.inner.clone(), list_path(project, filter, limit), FETCH_ACTION)
            .accept(DRAFTS_MEDIA_TYPE)
            .build()
    }
}

fn list_path(project: &Project, filter: &BTreeMap<String, String>, limit: usize) -> String {
    let mut path = format!(
        "repos/{}/{}/pulls?per_page={}",
        project.owner,
        project.name,
        per_page(limit, MAX_PAGE_SIZE)
    );
    if !filter.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(filter.iter())
            .finish();
        path.push('&');
        path.push_str(&query);
    }
    path
}
