use serde_json::{json, Value};

use super::paginator::{PageLimits, PageRun, PagedResource, Paginator};
use super::transport::ApiRequest;
use super::types::{MergeEvent, RedemptionEvent, SplitEvent};
use crate::errors::FetchError;

const SPLITS_QUERY: &str = "query Splits($user: String!, $first: Int!, $skip: Int!) { \
    splits(where: { stakeholder: $user }, first: $first, skip: $skip, orderBy: timestamp, orderDirection: asc) \
    { id timestamp amount } }";

const MERGES_QUERY: &str = "query Merges($user: String!, $first: Int!, $skip: Int!) { \
    merges(where: { stakeholder: $user }, first: $first, skip: $skip, orderBy: timestamp, orderDirection: asc) \
    { id timestamp amount } }";

const REDEMPTIONS_QUERY: &str = "query Redemptions($user: String!, $first: Int!, $skip: Int!) { \
    redemptions(where: { redeemer: $user }, first: $first, skip: $skip, orderBy: timestamp, orderDirection: asc) \
    { id timestamp payout } }";

/// One entity collection of the activity subgraph, paged with `first`/`skip`.
struct GraphQlCollection {
    field: &'static str,
    query: &'static str,
    url: String,
    user: String,
}

impl PagedResource for GraphQlCollection {
    fn name(&self) -> &str {
        self.field
    }

    fn page_request(&self, limit: u32, offset: u32) -> ApiRequest {
        ApiRequest::post(
            self.url.clone(),
            json!({
                "query": self.query,
                "variables": { "user": self.user, "first": limit, "skip": offset },
            }),
        )
    }

    fn page_items(&self, body: Value) -> Result<Vec<Value>, FetchError> {
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(FetchError::GraphQl(message));
            }
        }

        match body.pointer(&format!("/data/{}", self.field)) {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(FetchError::GraphQl(format!("response has no data.{}", self.field))),
        }
    }
}

/// Client for the on-chain position-event subgraph. Every collection is an
/// auxiliary resource and honours the page ceiling.
#[derive(Clone)]
pub struct SubgraphClient {
    paginator: Paginator,
    url: String,
    limits: PageLimits,
}

impl SubgraphClient {
    pub fn new(paginator: Paginator, url: impl Into<String>, page_size: u32, max_pages: u32) -> Self {
        Self {
            paginator,
            url: url.into(),
            limits: PageLimits::capped(page_size, max_pages),
        }
    }

    fn collection(&self, field: &'static str, query: &'static str, wallet: &str) -> GraphQlCollection {
        GraphQlCollection {
            field,
            query,
            url: self.url.clone(),
            user: wallet.to_string(),
        }
    }

    pub async fn splits(&self, wallet: &str) -> PageRun<SplitEvent> {
        self.paginator
            .cursor(self.collection("splits", SPLITS_QUERY, wallet), self.limits)
            .collect(|_| true)
            .await
    }

    pub async fn merges(&self, wallet: &str) -> PageRun<MergeEvent> {
        self.paginator
            .cursor(self.collection("merges", MERGES_QUERY, wallet), self.limits)
            .collect(|_| true)
            .await
    }

    pub async fn redemptions(&self, wallet: &str) -> PageRun<RedemptionEvent> {
        self.paginator
            .cursor(self.collection("redemptions", REDEMPTIONS_QUERY, wallet), self.limits)
            .collect(|_| true)
            .await
    }
}
