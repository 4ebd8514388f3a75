use std::marker::PhantomData;
use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;

use super::fetcher::Fetcher;
use super::transport::ApiRequest;
use crate::errors::{DataShapeError, FetchError};

/// An offset-addressable collection on the upstream.
pub trait PagedResource: Send + Sync {
    fn name(&self) -> &str;

    fn page_request(&self, limit: u32, offset: u32) -> ApiRequest;

    /// Pull the record array out of a response body.
    fn page_items(&self, body: Value) -> Result<Vec<Value>, FetchError> {
        Ok(serde_json::from_value(body)?)
    }
}

/// Data-API style resource: `GET url?...&limit=&offset=` returning a JSON array.
#[derive(Debug, Clone)]
pub struct RestResource {
    name: String,
    url: String,
    params: Vec<(String, String)>,
}

impl RestResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

impl PagedResource for RestResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_request(&self, limit: u32, offset: u32) -> ApiRequest {
        let request = self
            .params
            .iter()
            .fold(ApiRequest::get(&self.url), |req, (k, v)| req.param(k, v));
        request.param("limit", limit).param("offset", offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: u32,
    /// Hard ceiling on pages; `None` pages until the feed ends.
    pub max_pages: Option<u32>,
}

impl PageLimits {
    pub fn unbounded(page_size: u32) -> Self {
        Self {
            page_size,
            max_pages: None,
        }
    }

    pub fn capped(page_size: u32, max_pages: u32) -> Self {
        Self {
            page_size,
            max_pages: Some(max_pages),
        }
    }
}

/// Why a page sequence ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEnd {
    /// The upstream returned an empty page.
    Exhausted,
    /// The last page was shorter than requested.
    ShortPage,
    /// The caller's stop predicate fired.
    StopCondition,
    /// The page ceiling was reached; later history was not read.
    PageCap,
}

/// One decoded page. Malformed records are set aside, not fatal.
#[derive(Debug)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Number of records the upstream returned, malformed ones included.
    pub raw_len: usize,
    /// Final record as the upstream sent it, whether or not it decoded.
    pub raw_last: Option<Value>,
    pub skipped: Vec<DataShapeError>,
}

/// Result of draining a cursor. Records gathered before a failure are kept.
#[derive(Debug)]
pub struct PageRun<T> {
    pub records: Vec<T>,
    pub pages: u32,
    pub skipped: usize,
    pub outcome: Result<PageEnd, FetchError>,
}

impl<T> PageRun<T> {
    pub fn is_complete(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn truncated(&self) -> bool {
        matches!(self.outcome, Ok(PageEnd::PageCap))
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}

type StopPredicate<'a, T> = Box<dyn Fn(&Page<T>) -> bool + Send + Sync + 'a>;

/// Drives the fetcher across offset-paged resources with a politeness delay
/// between consecutive requests.
#[derive(Clone)]
pub struct Paginator {
    fetcher: Fetcher,
    page_delay: Duration,
}

impl Paginator {
    pub fn new(fetcher: Fetcher, page_delay: Duration) -> Self {
        Self {
            fetcher,
            page_delay,
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Fresh cursor at offset zero.
    pub fn cursor<'a, T>(
        &'a self,
        resource: impl PagedResource + 'a,
        limits: PageLimits,
    ) -> PageCursor<'a, T> {
        PageCursor {
            paginator: self,
            resource: Box::new(resource),
            limits,
            stop: None,
            offset: 0,
            pages: 0,
            end: None,
            failed: false,
            _record: PhantomData,
        }
    }
}

/// Lazily walks one resource page by page.
pub struct PageCursor<'a, T> {
    paginator: &'a Paginator,
    resource: Box<dyn PagedResource + 'a>,
    limits: PageLimits,
    stop: Option<StopPredicate<'a, T>>,
    offset: u32,
    pages: u32,
    end: Option<PageEnd>,
    failed: bool,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T> PageCursor<'a, T>
where
    T: DeserializeOwned,
{
    /// Stop after the first page for which `stop` holds. The predicate sees
    /// the page before any caller-side filtering, including `raw_last`.
    pub fn stop_when<F>(mut self, stop: F) -> Self
    where
        F: Fn(&Page<T>) -> bool + Send + Sync + 'a,
    {
        self.stop = Some(Box::new(stop));
        self
    }

    /// Fetch the next page, or `None` once the sequence has ended.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>, FetchError> {
        if self.end.is_some() || self.failed {
            return Ok(None);
        }
        if self.pages > 0 {
            sleep(self.paginator.page_delay).await;
        }

        let request = self
            .resource
            .page_request(self.limits.page_size, self.offset);
        let items = match self.fetch_items(&request).await {
            Ok(items) => items,
            Err(e) => {
                self.failed = true;
                tracing::warn!(
                    resource = self.resource.name(),
                    offset = self.offset,
                    error = %e,
                    "page fetch failed, ending sequence"
                );
                return Err(e);
            }
        };

        self.pages += 1;
        counter!("pages_fetched_total", "resource" => self.resource.name().to_string())
            .increment(1);

        let page: Page<T> = decode_page(self.resource.name(), self.offset as usize, items);
        self.offset += self.limits.page_size;

        self.end = if page.raw_len == 0 {
            Some(PageEnd::Exhausted)
        } else if page.raw_len < self.limits.page_size as usize {
            Some(PageEnd::ShortPage)
        } else if self.stop.as_ref().is_some_and(|stop| stop(&page)) {
            Some(PageEnd::StopCondition)
        } else if self.limits.max_pages.is_some_and(|max| self.pages >= max) {
            Some(PageEnd::PageCap)
        } else {
            None
        };

        Ok(Some(page))
    }

    /// Drain the cursor, keeping only records accepted by `keep`.
    pub async fn collect<K>(mut self, keep: K) -> PageRun<T>
    where
        K: Fn(&T) -> bool,
    {
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut failure = None;

        loop {
            match self.next_page().await {
                Ok(Some(page)) => {
                    skipped += page.skipped.len();
                    records.extend(page.records.into_iter().filter(|r| keep(r)));
                }
                Ok(None) => break,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let outcome = match failure {
            Some(e) => Err(e),
            None => Ok(self.end.unwrap_or(PageEnd::Exhausted)),
        };

        PageRun {
            records,
            pages: self.pages,
            skipped,
            outcome,
        }
    }

    async fn fetch_items(&self, request: &ApiRequest) -> Result<Vec<Value>, FetchError> {
        let body = self.paginator.fetcher.fetch(request).await?;
        self.resource.page_items(body)
    }
}

fn decode_page<T: DeserializeOwned>(resource: &str, offset: usize, items: Vec<Value>) -> Page<T> {
    let raw_len = items.len();
    let raw_last = items.last().cloned();
    let mut records = Vec::with_capacity(raw_len);
    let mut skipped = Vec::new();

    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                let err = DataShapeError {
                    resource: resource.to_string(),
                    index: offset + i,
                    reason: e.to_string(),
                };
                tracing::debug!(error = %err, "skipping malformed record");
                skipped.push(err);
            }
        }
    }

    if !skipped.is_empty() {
        counter!("records_skipped_total").increment(skipped.len() as u64);
    }

    Page {
        records,
        raw_len,
        raw_last,
        skipped,
    }
}
