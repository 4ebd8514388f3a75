use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{normalize_wallet, Side};

/// One fill from the public `/trades` feed (newest first). Discovery only
/// needs who traded and when, so everything else is optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedTrade {
    pub proxy_wallet: String,
    /// Epoch seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl FeedTrade {
    /// Case-normalized trader address.
    pub fn wallet(&self) -> String {
        normalize_wallet(&self.proxy_wallet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityKind {
    Trade,
    Split,
    Merge,
    Redeem,
    Reward,
    Conversion,
    #[serde(other)]
    Other,
}

/// One entry of a wallet's `/activity` history.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(default)]
    pub proxy_wallet: Option<String>,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub usdc_size: Decimal,
    /// Empty for non-trade activity such as redemptions.
    #[serde(default)]
    pub side: Option<String>,
}

impl ActivityRecord {
    pub fn side(&self) -> Option<Side> {
        self.side.as_deref().and_then(Side::from_api_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_trade_decodes_data_api_shape() {
        let raw = json!({
            "proxyWallet": "0xAbC0000000000000000000000000000000000001",
            "side": "BUY",
            "asset": "1234",
            "conditionId": "0xcond",
            "size": 20,
            "price": 0.55,
            "timestamp": 1_700_000_000,
            "title": "Will it rain?",
            "outcome": "Yes"
        });
        let trade: FeedTrade = serde_json::from_value(raw).unwrap();
        assert_eq!(trade.wallet(), "0xabc0000000000000000000000000000000000001");
        assert_eq!(trade.timestamp, 1_700_000_000);
        assert_eq!(trade.condition_id.as_deref(), Some("0xcond"));
    }

    #[test]
    fn test_feed_trade_without_side_or_size_still_decodes() {
        let raw = json!({ "proxyWallet": "0xDEF", "side": "", "timestamp": 5 });
        let trade: FeedTrade = serde_json::from_value(raw).unwrap();
        assert_eq!(trade.wallet(), "0xdef");
    }

    #[test]
    fn test_feed_trade_missing_wallet_or_timestamp_is_rejected() {
        let raw = json!({ "side": "SELL", "size": 1, "timestamp": 1 });
        assert!(serde_json::from_value::<FeedTrade>(raw).is_err());
        let raw = json!({ "proxyWallet": "0x01", "side": "SELL" });
        assert!(serde_json::from_value::<FeedTrade>(raw).is_err());
    }

    #[test]
    fn test_activity_redeem_has_no_side() {
        let raw = json!({
            "proxyWallet": "0x01",
            "timestamp": 1_700_000_000,
            "type": "REDEEM",
            "usdcSize": 42.5,
            "side": ""
        });
        let record: ActivityRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.kind, ActivityKind::Redeem);
        assert_eq!(record.side(), None);
        assert_eq!(record.usdc_size, Decimal::new(425, 1));
    }

    #[test]
    fn test_activity_unknown_kind_maps_to_other() {
        let raw = json!({ "timestamp": 1, "type": "MAKER_REBATE", "usdcSize": 0 });
        let record: ActivityRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.kind, ActivityKind::Other);
    }
}
