use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::time::{interval, MissedTickBehavior};

use crate::errors::DiscoveryError;
use crate::models::FeedTrade;
use crate::polymarket::DataClient;
use crate::store::CheckpointStore;

/// Source of "now" in epoch seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp())
}

/// Outcome of one discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub new_wallets: BTreeSet<String>,
    pub known_wallets: usize,
    pub fresh_trades: usize,
    pub pages: u32,
    /// Watermark persisted at the end of the cycle.
    pub watermark: i64,
    /// False when the trade feed failed part-way; the watermark was then
    /// left where it was so the window is scanned again next tick.
    pub complete: bool,
}

/// Finds wallets that traded since the last checkpoint and records them.
pub struct DiscoveryJob {
    client: DataClient,
    store: CheckpointStore,
    clock: Clock,
    running: AtomicBool,
}

/// Clears the in-flight flag when a cycle finishes or is dropped mid-way.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DiscoveryJob {
    pub fn new(client: DataClient, store: CheckpointStore) -> Self {
        Self {
            client,
            store,
            clock: system_clock(),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run a cycle unless one is already in flight, in which case the tick
    /// is skipped and `Ok(None)` returned.
    pub async fn tick(&self) -> Result<Option<DiscoveryReport>, DiscoveryError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("previous discovery cycle still running, skipping tick");
            return Ok(None);
        }
        let _guard = RunningGuard(&self.running);
        self.run_once().await.map(Some)
    }

    /// One full cycle: load checkpoint, page fresh trades, persist the delta.
    ///
    /// Rate-limit exhaustion aborts the cycle without touching the
    /// checkpoint. Any other feed failure keeps the wallets found so far but
    /// holds the watermark back.
    pub async fn run_once(&self) -> Result<DiscoveryReport, DiscoveryError> {
        let mut checkpoint = self.store.load((self.clock)());
        let since = checkpoint.last_timestamp;

        tracing::info!(since, known = checkpoint.wallets.len(), "running trade scan");

        let run = self.client.trades_since(since).await;
        let pages = run.pages;
        let complete = match run.outcome {
            Ok(end) => {
                tracing::debug!(?end, pages, "trade feed drained");
                true
            }
            Err(e) if e.is_rate_limited() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    pages,
                    "trade feed failed mid-scan, holding watermark at {since}"
                );
                false
            }
        };

        let new_wallets = checkpoint.unseen(run.records.iter().map(FeedTrade::wallet));
        checkpoint.absorb(&new_wallets);

        if new_wallets.is_empty() {
            tracing::info!("no new wallets this round");
        } else {
            tracing::info!(count = new_wallets.len(), "found new wallets");
            for wallet in &new_wallets {
                tracing::info!(wallet = %wallet, "new wallet");
            }
        }

        if complete {
            checkpoint.advance_to((self.clock)());
        }
        if complete || !new_wallets.is_empty() {
            self.store.save(&checkpoint)?;
        }

        counter!("wallets_discovered_total").increment(new_wallets.len() as u64);
        gauge!("known_wallets").set(checkpoint.wallets.len() as f64);

        Ok(DiscoveryReport {
            known_wallets: checkpoint.wallets.len(),
            fresh_trades: run.records.len(),
            new_wallets,
            pages,
            watermark: checkpoint.last_timestamp,
            complete,
        })
    }
}

/// Fire the job immediately and then every `every`, until `shutdown`
/// resolves. A tick that overruns delays the next one rather than
/// overlapping it; a shutdown during a tick drops the tick unsaved.
pub async fn run_discovery_loop<S>(job: &DiscoveryJob, every: Duration, shutdown: S)
where
    S: Future<Output = ()>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(interval_secs = every.as_secs(), "discovery scheduler started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                tokio::select! {
                    _ = &mut shutdown => break,
                    result = job.tick() => match result {
                        Ok(Some(report)) => tracing::info!(
                            new = report.new_wallets.len(),
                            known = report.known_wallets,
                            watermark = report.watermark,
                            complete = report.complete,
                            "discovery cycle finished"
                        ),
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "discovery cycle failed"),
                    },
                }
            }
        }
    }

    tracing::info!("discovery scheduler stopped");
}
