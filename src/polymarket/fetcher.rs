use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rand::Rng;
use tokio::time::sleep;

use super::transport::{ApiRequest, Transport};
use crate::config::FetcherConfig;
use crate::errors::FetchError;

const HTTP_TOO_MANY_REQUESTS: u16 = 429;
const ERROR_BODY_PREVIEW: usize = 120;

/// Issues single requests and absorbs upstream throttling with exponential
/// backoff. Any other failure is returned to the caller untouched.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    config: FetcherConfig,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, config: FetcherConfig) -> Self {
        Self { transport, config }
    }

    pub async fn fetch(&self, request: &ApiRequest) -> Result<serde_json::Value, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let resp = self.transport.send(request).await?;

            if resp.status != HTTP_TOO_MANY_REQUESTS {
                if !(200..300).contains(&resp.status) {
                    return Err(FetchError::Status {
                        status: resp.status,
                        body: preview(&resp.body),
                    });
                }
                return Ok(serde_json::from_str(&resp.body)?);
            }

            counter!("rate_limited_total").increment(1);

            if attempt + 1 == max_attempts {
                break;
            }

            let jitter: f64 = rand::thread_rng().gen();
            let wait = backoff_delay(attempt, jitter);
            tracing::warn!(
                url = request.url(),
                attempt = attempt + 1,
                wait_secs = wait.as_secs_f64(),
                "429 throttled, backing off"
            );
            sleep(wait).await;
        }

        Err(FetchError::RateLimited {
            attempts: max_attempts,
        })
    }
}

/// `2^attempt` seconds plus up to one second of jitter; `attempt` counts
/// from zero.
pub fn backoff_delay(attempt: u32, jitter: f64) -> Duration {
    let base = 2f64.powi(attempt.min(16) as i32);
    Duration::from_secs_f64(base + jitter.clamp(0.0, 1.0))
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}
