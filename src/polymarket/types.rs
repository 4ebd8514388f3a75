use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// On-chain collateral amounts are integers with six implied decimals.
pub const USDC_DECIMALS: u32 = 6;

// ---------------------------------------------------------------------------
// Portfolio value (Data API `/value`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValueEntry {
    #[serde(default)]
    pub user: Option<String>,
    pub value: Decimal,
}

// ---------------------------------------------------------------------------
// Position events (activity subgraph)
// ---------------------------------------------------------------------------

/// Collateral split into a full outcome set: money going into a market.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SplitEvent {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "raw_usdc")]
    pub amount: Decimal,
}

/// Full outcome set merged back into collateral: money coming out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeEvent {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "raw_usdc")]
    pub amount: Decimal,
}

/// Winning (or losing, payout zero) positions redeemed after resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedemptionEvent {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "raw_usdc")]
    pub payout: Decimal,
}

/// Convert a raw integer amount (string or number) into USDC units.
pub fn usdc_from_raw(raw: i128) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(raw, USDC_DECIMALS).ok()
}

fn raw_usdc<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    let raw = match Raw::deserialize(deserializer)? {
        Raw::Int(n) => i128::from(n),
        Raw::Text(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| serde::de::Error::custom(format!("bad integer amount {s:?}: {e}")))?,
    };
    usdc_from_raw(raw).ok_or_else(|| serde::de::Error::custom("amount out of range"))
}
