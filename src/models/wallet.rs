use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Performance snapshot of one wallet, recomputed from scratch on every
/// grading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletMetrics {
    pub wallet: String,
    pub profit: Decimal,
    /// Trading turnover; never negative.
    pub volume: Decimal,
    /// profit / volume, or zero when there is no volume.
    pub roi: Decimal,
    pub win_rate: Decimal,
    /// Settlement turnover: redemption payouts read from auxiliary resources.
    pub auxiliary_volume: Decimal,
    /// Set when a page-capped resource hit its ceiling, so volume is a
    /// lower bound.
    pub truncated: bool,
}

impl WalletMetrics {
    pub fn new(wallet: impl Into<String>, profit: Decimal, volume: Decimal, win_rate: Decimal) -> Self {
        let volume = volume.max(Decimal::ZERO);
        Self {
            wallet: wallet.into(),
            profit,
            volume,
            roi: roi(profit, volume),
            win_rate,
            auxiliary_volume: Decimal::ZERO,
            truncated: false,
        }
    }

    pub fn with_auxiliary_volume(mut self, auxiliary_volume: Decimal) -> Self {
        self.auxiliary_volume = auxiliary_volume;
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}

fn roi(profit: Decimal, volume: Decimal) -> Decimal {
    if volume > Decimal::ZERO {
        profit.checked_div(volume).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

/// Share of settled positions that paid out; zero with no settlements.
pub fn win_rate(wins: usize, settled: usize) -> Decimal {
    if settled == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(wins as i64) / Decimal::from(settled as i64)
}

/// One entry of a precomputed `raw_data.json` metrics dump.
#[derive(Debug, Clone, Deserialize)]
pub struct PrecomputedMetrics {
    pub wallet: String,
    pub metrics: PrecomputedFigures,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrecomputedFigures {
    pub pnl: Decimal,
    #[serde(default)]
    pub win_rate: Decimal,
    pub volume: Decimal,
}

impl From<PrecomputedMetrics> for WalletMetrics {
    fn from(raw: PrecomputedMetrics) -> Self {
        WalletMetrics::new(raw.wallet, raw.metrics.pnl, raw.metrics.volume, raw.metrics.win_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_is_profit_over_volume() {
        let m = WalletMetrics::new("0x01", Decimal::from(50), Decimal::from(200), Decimal::ZERO);
        assert_eq!(m.roi, Decimal::new(25, 2));
    }

    #[test]
    fn test_roi_zero_without_volume() {
        let m = WalletMetrics::new("0x01", Decimal::from(50), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(m.roi, Decimal::ZERO);
    }

    #[test]
    fn test_negative_volume_is_clamped() {
        let m = WalletMetrics::new("0x01", Decimal::from(-5), Decimal::from(-10), Decimal::ZERO);
        assert_eq!(m.volume, Decimal::ZERO);
        assert_eq!(m.roi, Decimal::ZERO);
    }

    #[test]
    fn test_win_rate_guarded() {
        assert_eq!(win_rate(0, 0), Decimal::ZERO);
        assert_eq!(win_rate(3, 4), Decimal::new(75, 2));
    }

    #[test]
    fn test_precomputed_conversion() {
        let raw: PrecomputedMetrics = serde_json::from_str(
            r#"{"wallet":"0xabc","metrics":{"pnl":120.5,"win_rate":0.25,"volume":1000}}"#,
        )
        .unwrap();
        let m = WalletMetrics::from(raw);
        assert_eq!(m.wallet, "0xabc");
        assert_eq!(m.win_rate, Decimal::new(25, 2));
        assert_eq!(m.roi, Decimal::new(1205, 4));
    }
}
