use std::path::PathBuf;

/// Failure of a single logical fetch against the upstream API.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited: gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("undecodable response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("invalid request URL: {0}")]
    Url(String),
}

impl FetchError {
    /// Rate-limit exhaustion is fatal for the current cycle; every other
    /// error only ends the page sequence it occurred in.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// A record that did not have the shape its resource promises.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed {resource} record #{index}: {reason}")]
pub struct DataShapeError {
    pub resource: String,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to persist {}: {source}", path.display())]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl PersistenceError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery cycle aborted: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("grading aborted at wallet {wallet}: {source}")]
    Fetch {
        wallet: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
