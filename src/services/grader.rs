use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use metrics::counter;
use tokio::time::sleep;

use crate::errors::{GradeError, PersistenceError};
use crate::intelligence::{MetricsSource, ScoringStrategy};
use crate::models::{sorted_by_score, GradedResult, WalletMetrics};
use crate::store::write_grades;

const PROGRESS_EVERY: usize = 25;

#[derive(Debug, Clone)]
pub struct GradeOptions {
    pub strategy: ScoringStrategy,
    /// Number of wallets aggregated at once.
    pub concurrency: usize,
    /// Pause after each wallet within a lane.
    pub wallet_delay: Duration,
}

/// Both orderings of one grading run.
#[derive(Debug, Clone)]
pub struct GradeReport {
    /// Wallet-list order.
    pub graded: Vec<GradedResult>,
    /// Score descending, ties in wallet-list order.
    pub sorted: Vec<GradedResult>,
    pub evaluated: usize,
    /// Wallets dropped by the strategy's output policy.
    pub filtered: usize,
    /// Wallets whose volume is a lower bound because of the page ceiling.
    pub truncated: usize,
}

/// Aggregate metrics for every wallet, at most `concurrency` at a time.
///
/// Each of the `concurrency` lanes pauses for `wallet_delay` after a wallet
/// before picking up the next, so the request rate stays bounded per lane.
/// Results come back in input order. Rate-limit exhaustion on any wallet
/// aborts the run.
pub async fn collect_metrics(
    source: &dyn MetricsSource,
    wallets: &[String],
    concurrency: usize,
    wallet_delay: Duration,
) -> Result<Vec<WalletMetrics>, GradeError> {
    let total = wallets.len();
    let done = AtomicUsize::new(0);
    let done = &done;

    tracing::info!(total, concurrency, source = source.name(), "grading wallets");

    stream::iter(wallets.iter().enumerate())
        .map(|(index, wallet)| async move {
            let result = source.aggregate(wallet).await;

            if index + 1 < total {
                sleep(wallet_delay).await;
            }

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            counter!("wallets_graded_total").increment(1);
            if finished % PROGRESS_EVERY == 0 || finished == total {
                tracing::info!(graded = finished, total, "grading progress");
            }

            result.map_err(|e| GradeError::Fetch {
                wallet: wallet.clone(),
                source: e,
            })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Apply the strategy's output policy and score, in input order.
pub fn grade(metrics: &[WalletMetrics], strategy: ScoringStrategy) -> GradeReport {
    let graded: Vec<GradedResult> = metrics
        .iter()
        .filter(|m| strategy.retains(m))
        .map(|m| GradedResult::new(m, strategy.score(m)))
        .collect();
    let sorted = sorted_by_score(&graded);

    GradeReport {
        evaluated: metrics.len(),
        filtered: metrics.len() - graded.len(),
        truncated: metrics.iter().filter(|m| m.truncated).count(),
        graded,
        sorted,
    }
}

pub async fn grade_wallets(
    source: &dyn MetricsSource,
    wallets: &[String],
    options: &GradeOptions,
) -> Result<GradeReport, GradeError> {
    let metrics = collect_metrics(source, wallets, options.concurrency, options.wallet_delay).await?;

    for m in metrics.iter().filter(|m| m.truncated) {
        tracing::warn!(
            wallet = %m.wallet,
            volume = %m.volume,
            "history exceeds page ceiling, volume is a lower bound"
        );
    }

    Ok(grade(&metrics, options.strategy))
}

/// Write the input-order and score-order files for a report.
pub fn write_report(
    report: &GradeReport,
    strategy: ScoringStrategy,
    out: &Path,
    sorted_out: &Path,
) -> Result<(), PersistenceError> {
    write_grades(out, strategy.layout(), &report.graded)?;
    write_grades(sorted_out, strategy.layout(), &report.sorted)?;
    tracing::info!(
        rows = report.graded.len(),
        out = %out.display(),
        sorted_out = %sorted_out.display(),
        "grades written"
    );
    Ok(())
}
