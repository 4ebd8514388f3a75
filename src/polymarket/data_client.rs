use rust_decimal::Decimal;
use serde_json::Value;

use super::paginator::{Page, PageLimits, PageRun, Paginator, RestResource};
use super::transport::ApiRequest;
use super::types::ValueEntry;
use crate::config::PaginationConfig;
use crate::errors::FetchError;
use crate::models::{ActivityKind, ActivityRecord, FeedTrade};

/// Read-only client for the public Polymarket Data API.
#[derive(Clone)]
pub struct DataClient {
    paginator: Paginator,
    base_url: String,
    pages: PaginationConfig,
}

impl DataClient {
    pub fn new(paginator: Paginator, base_url: impl Into<String>, pages: PaginationConfig) -> Self {
        Self {
            paginator,
            base_url: base_url.into(),
            pages,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Every trade on the venue newer than `since` (epoch seconds).
    ///
    /// The feed is newest-first, so paging stops at the first page whose
    /// last row, as sent, reaches back to `since`; that page still
    /// contributes its fresh rows. Rows that fail to decode still count
    /// towards the stop decision.
    pub async fn trades_since(&self, since: i64) -> PageRun<FeedTrade> {
        let resource = RestResource::new("trades", self.url("trades"));
        self.paginator
            .cursor(resource, PageLimits::unbounded(self.pages.trades_page_size))
            .stop_when(move |page: &Page<FeedTrade>| {
                let oldest = page
                    .raw_last
                    .as_ref()
                    .and_then(raw_timestamp)
                    .or_else(|| page.records.iter().map(|t| t.timestamp).min());
                oldest.is_some_and(|ts| ts <= since)
            })
            .collect(|t| t.timestamp > since)
            .await
    }

    /// A wallet's full trade history, oldest first.
    pub async fn trade_activity(&self, wallet: &str) -> PageRun<ActivityRecord> {
        let resource = RestResource::new("activity:trade", self.url("activity"))
            .param("user", wallet)
            .param("type", "TRADE")
            .param("sortDirection", "ASC");
        self.paginator
            .cursor(resource, PageLimits::unbounded(self.pages.activity_page_size))
            .collect(|r: &ActivityRecord| r.kind == ActivityKind::Trade)
            .await
    }

    /// A wallet's redemptions, capped at the auxiliary page ceiling.
    pub async fn redemptions(&self, wallet: &str) -> PageRun<ActivityRecord> {
        let resource = RestResource::new("activity:redeem", self.url("activity"))
            .param("user", wallet)
            .param("type", "REDEEM")
            .param("sortDirection", "ASC");
        self.paginator
            .cursor(
                resource,
                PageLimits::capped(self.pages.activity_page_size, self.pages.aux_max_pages),
            )
            .collect(|r: &ActivityRecord| r.kind == ActivityKind::Redeem)
            .await
    }

    /// Current mark-to-market value of the wallet's open positions.
    ///
    /// Missing or unreadable snapshots count as zero; only rate-limit
    /// exhaustion is surfaced.
    pub async fn portfolio_value(&self, wallet: &str) -> Result<Decimal, FetchError> {
        let request = ApiRequest::get(self.url("value")).param("user", wallet);
        let body = match self.paginator.fetcher().fetch(&request).await {
            Ok(body) => body,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                tracing::debug!(wallet, error = %e, "value snapshot unavailable, using 0");
                return Ok(Decimal::ZERO);
            }
        };

        match serde_json::from_value::<Vec<ValueEntry>>(body) {
            Ok(entries) => Ok(entries.first().map(|e| e.value).unwrap_or(Decimal::ZERO)),
            Err(e) => {
                tracing::debug!(wallet, error = %e, "unexpected value payload, using 0");
                Ok(Decimal::ZERO)
            }
        }
    }
}

/// `timestamp` of an undecoded feed row, as a number or numeric string.
fn raw_timestamp(row: &Value) -> Option<i64> {
    match row.get("timestamp")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
