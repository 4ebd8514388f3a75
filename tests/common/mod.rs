use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use polyscan::config::{FetcherConfig, PaginationConfig};
use polyscan::errors::FetchError;
use polyscan::polymarket::{ApiRequest, Fetcher, Paginator, RawResponse, Transport};

#[allow(dead_code)]
pub const PAGE_DELAY: Duration = Duration::from_millis(150);

type Handler = Box<dyn Fn(&ApiRequest) -> RawResponse + Send + Sync>;

/// In-memory upstream: answers every request through a handler and keeps a
/// log of what was asked.
pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> RawResponse + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replay `responses` in order; anything past the end is a 500.
    pub fn sequence(responses: Vec<RawResponse>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| status(500))
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok((self.handler)(request))
    }
}

#[allow(dead_code)]
pub fn ok(body: Value) -> RawResponse {
    RawResponse {
        status: 200,
        body: body.to_string(),
    }
}

#[allow(dead_code)]
pub fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        body: format!("{{\"error\":\"status {code}\"}}"),
    }
}

/// Serve `records` as an offset-paged Data-API array.
#[allow(dead_code)]
pub fn rest_page(records: &[Value], request: &ApiRequest) -> RawResponse {
    let limit: usize = request
        .query_value("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(records.len());
    let offset: usize = request
        .query_value("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    ok(Value::Array(
        records.iter().skip(offset).take(limit).cloned().collect(),
    ))
}

/// Serve `records` as a `first`/`skip` paged GraphQL collection.
#[allow(dead_code)]
pub fn graphql_page(field: &str, records: &[Value], request: &ApiRequest) -> RawResponse {
    let ApiRequest::Post { body, .. } = request else {
        return status(405);
    };
    let first = body["variables"]["first"].as_u64().unwrap_or(100) as usize;
    let skip = body["variables"]["skip"].as_u64().unwrap_or(0) as usize;
    let page: Vec<Value> = records.iter().skip(skip).take(first).cloned().collect();
    let mut data = serde_json::Map::new();
    data.insert(field.to_string(), Value::Array(page));
    ok(json!({ "data": data }))
}

#[allow(dead_code)]
pub fn graphql_field(request: &ApiRequest) -> Option<&'static str> {
    let ApiRequest::Post { body, .. } = request else {
        return None;
    };
    let query = body["query"].as_str()?;
    ["splits", "merges", "redemptions"]
        .into_iter()
        .find(|field| query.contains(&format!("{field}(")))
}

#[allow(dead_code)]
pub fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        request_timeout: Duration::from_secs(30),
        max_attempts: 4,
    }
}

#[allow(dead_code)]
pub fn pagination_config(page_size: u32, aux_max_pages: u32) -> PaginationConfig {
    PaginationConfig {
        trades_page_size: page_size,
        activity_page_size: page_size,
        subgraph_page_size: page_size,
        page_delay: PAGE_DELAY,
        aux_max_pages,
    }
}

#[allow(dead_code)]
pub fn paginator(transport: &Arc<ScriptedTransport>) -> Paginator {
    let transport: Arc<dyn Transport> = transport.clone();
    Paginator::new(Fetcher::new(transport, fetcher_config()), PAGE_DELAY)
}

/// A `/trades` row.
#[allow(dead_code)]
pub fn trade(wallet: &str, timestamp: i64) -> Value {
    json!({
        "proxyWallet": wallet,
        "side": "BUY",
        "asset": "token-1",
        "conditionId": "0xcond",
        "size": 10,
        "price": 0.5,
        "timestamp": timestamp,
    })
}
