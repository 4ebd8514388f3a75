use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::errors::FetchError;

/// One outbound call, independent of the HTTP client that carries it.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Get {
        url: String,
        query: Vec<(String, String)>,
    },
    Post {
        url: String,
        body: serde_json::Value,
    },
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        ApiRequest::Get {
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        ApiRequest::Post {
            url: url.into(),
            body,
        }
    }

    /// Append a query parameter. Ignored for POST requests.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        if let ApiRequest::Get { query, .. } = &mut self {
            query.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn url(&self) -> &str {
        match self {
            ApiRequest::Get { url, .. } | ApiRequest::Post { url, .. } => url,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        match self {
            ApiRequest::Get { query, .. } => query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            ApiRequest::Post { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Carries an [`ApiRequest`] to the upstream and hands back status and body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, FetchError>;
}

/// `reqwest`-backed transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, FetchError> {
        let builder = match request {
            ApiRequest::Get { url, query } => {
                let url = Url::parse_with_params(url, query)
                    .map_err(|e| FetchError::Url(format!("{url}: {e}")))?;
                self.http.get(url)
            }
            ApiRequest::Post { url, body } => self.http.post(url).json(body),
        };

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Transport(e)
            }
        })?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(RawResponse { status, body })
    }
}
