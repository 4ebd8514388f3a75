use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::WalletMetrics;
use crate::store::GradeLayout;

/// Named Smart-Score formula. The two formulas rank wallets differently and
/// are kept apart on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    /// tanh-saturated blend of ROI, volume and profit.
    BoundedSaturation,
    /// Clamped linear blend of PnL, win rate, volume and ROI.
    LinearClamped,
}

impl ScoringStrategy {
    pub fn score(&self, metrics: &WalletMetrics) -> f64 {
        match self {
            ScoringStrategy::BoundedSaturation => bounded_saturation_score(
                as_f64(metrics.roi),
                as_f64(metrics.volume),
                as_f64(metrics.profit),
            ),
            ScoringStrategy::LinearClamped => linear_clamped_score(
                as_f64(metrics.profit),
                as_f64(metrics.win_rate),
                as_f64(metrics.volume),
                as_f64(metrics.roi),
            ),
        }
    }

    /// Whether a wallet belongs in the graded output at all.
    ///
    /// The linear pipeline only reports winners: wallets without volume or
    /// without positive profit are dropped regardless of score.
    pub fn retains(&self, metrics: &WalletMetrics) -> bool {
        match self {
            ScoringStrategy::BoundedSaturation => true,
            ScoringStrategy::LinearClamped => {
                metrics.volume > Decimal::ZERO && metrics.profit > Decimal::ZERO
            }
        }
    }

    pub fn layout(&self) -> GradeLayout {
        match self {
            ScoringStrategy::BoundedSaturation => GradeLayout::Profit,
            ScoringStrategy::LinearClamped => GradeLayout::Pnl,
        }
    }
}

impl FromStr for ScoringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saturation" | "bounded" | "tanh" => Ok(ScoringStrategy::BoundedSaturation),
            "linear" | "clamped" => Ok(ScoringStrategy::LinearClamped),
            other => Err(format!("unknown scoring strategy: {other}")),
        }
    }
}

impl fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringStrategy::BoundedSaturation => write!(f, "saturation"),
            ScoringStrategy::LinearClamped => write!(f, "linear"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bounded saturation
// ---------------------------------------------------------------------------

/// `50 + 50 * (0.60 tanh(5 roi) + 0.25 tanh(volume / 1000) + 0.15 tanh(profit / 500))`,
/// rounded to one decimal. Neutral metrics land on exactly 50.
pub fn bounded_saturation_score(roi: f64, volume: f64, profit: f64) -> f64 {
    let raw = 0.60 * (5.0 * roi).tanh()
        + 0.25 * (volume / 1_000.0).tanh()
        + 0.15 * (profit / 500.0).tanh();
    round1(50.0 + 50.0 * raw)
}

// ---------------------------------------------------------------------------
// Linear clamped
// ---------------------------------------------------------------------------

/// PnL is normalised against 10k, volume against 100k; ROI enters unclamped
/// as a small bonus term.
pub fn linear_clamped_score(pnl: f64, win_rate: f64, volume: f64, roi: f64) -> f64 {
    let pnl_score = (pnl / 10_000.0).clamp(0.0, 1.0);
    let volume_score = (volume / 100_000.0).min(1.0);
    round1(100.0 * (0.4 * pnl_score + 0.3 * win_rate + 0.2 * volume_score + 0.1 * roi))
}

/// One decimal, ties away from zero (`2.5` tenths becomes `3`), not
/// banker's rounding.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn as_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
