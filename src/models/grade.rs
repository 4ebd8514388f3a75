use rust_decimal::Decimal;
use serde::Serialize;

use super::WalletMetrics;

/// Output row of a grading run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedResult {
    pub wallet: String,
    pub profit: Decimal,
    pub roi: Decimal,
    pub volume: Decimal,
    pub win_rate: Decimal,
    pub score: f64,
}

impl GradedResult {
    /// Project metrics into an output row: money to cents, ratios to four
    /// places.
    pub fn new(metrics: &WalletMetrics, score: f64) -> Self {
        Self {
            wallet: metrics.wallet.clone(),
            profit: metrics.profit.round_dp(2),
            roi: metrics.roi.round_dp(4),
            volume: metrics.volume.round_dp(2),
            win_rate: metrics.win_rate.round_dp(4),
            score,
        }
    }
}

/// Same rows ordered by score, highest first; equal scores keep their
/// original relative order.
pub fn sorted_by_score(results: &[GradedResult]) -> Vec<GradedResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted
}
