use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::FetchError;
use crate::models::{normalize_wallet, win_rate, Side, WalletMetrics};
use crate::polymarket::{DataClient, PageRun, SubgraphClient};

/// Builds a [`WalletMetrics`] snapshot for one wallet from upstream reads.
///
/// Implementations keep whatever history they managed to read when a feed
/// fails part-way; the only error they return is rate-limit exhaustion,
/// which aborts the whole grading run.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn aggregate(&self, wallet: &str) -> Result<WalletMetrics, FetchError>;
}

/// Split a page run into its records and truncation flag, escalating only
/// rate-limit exhaustion.
fn accept<T>(wallet: &str, run: PageRun<T>) -> Result<(Vec<T>, bool), FetchError> {
    let truncated = run.truncated();
    match run.outcome {
        Err(e) if e.is_rate_limited() => Err(e),
        Err(e) => {
            tracing::warn!(
                wallet,
                pages = run.pages,
                error = %e,
                "feed ended early, keeping partial history"
            );
            Ok((run.records, false))
        }
        Ok(_) => Ok((run.records, truncated)),
    }
}

// ---------------------------------------------------------------------------
// Data-API activity log
// ---------------------------------------------------------------------------

/// Trade-log metrics: BUY notional is spend, SELL notional is proceeds, and
/// open positions are marked to market with the `/value` snapshot.
pub struct ActivityMetricsSource {
    client: DataClient,
}

impl ActivityMetricsSource {
    pub fn new(client: DataClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsSource for ActivityMetricsSource {
    fn name(&self) -> &'static str {
        "activity"
    }

    async fn aggregate(&self, wallet: &str) -> Result<WalletMetrics, FetchError> {
        let address = normalize_wallet(wallet);

        let (trades, _) = accept(wallet, self.client.trade_activity(&address).await)?;
        let mut spend = Decimal::ZERO;
        let mut proceeds = Decimal::ZERO;
        for trade in &trades {
            match trade.side() {
                Some(Side::Buy) => spend += trade.usdc_size,
                Some(Side::Sell) => proceeds += trade.usdc_size,
                None => {}
            }
        }

        let value = self.client.portfolio_value(&address).await?;

        let (redeems, truncated) = accept(wallet, self.client.redemptions(&address).await)?;
        let wins = redeems.iter().filter(|r| r.usdc_size > Decimal::ZERO).count();
        let payouts = redeems.iter().map(|r| r.usdc_size).sum::<Decimal>();

        let profit = proceeds + value - spend;
        let volume = spend + proceeds;

        tracing::debug!(
            wallet,
            trades = trades.len(),
            %spend,
            %proceeds,
            %value,
            redemptions = redeems.len(),
            "aggregated activity metrics"
        );

        Ok(WalletMetrics::new(wallet, profit, volume, win_rate(wins, redeems.len()))
            .with_auxiliary_volume(payouts)
            .with_truncated(truncated))
    }
}

// ---------------------------------------------------------------------------
// On-chain position events
// ---------------------------------------------------------------------------

/// Event-sourced metrics: splits put collateral in, merges and redemption
/// payouts take it out.
pub struct OnChainMetricsSource {
    client: SubgraphClient,
}

impl OnChainMetricsSource {
    pub fn new(client: SubgraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsSource for OnChainMetricsSource {
    fn name(&self) -> &'static str {
        "onchain"
    }

    async fn aggregate(&self, wallet: &str) -> Result<WalletMetrics, FetchError> {
        let address = normalize_wallet(wallet);

        let (splits, splits_cut) = accept(wallet, self.client.splits(&address).await)?;
        let (merges, merges_cut) = accept(wallet, self.client.merges(&address).await)?;
        let (redemptions, redemptions_cut) =
            accept(wallet, self.client.redemptions(&address).await)?;

        let split_total = splits.iter().map(|s| s.amount).sum::<Decimal>();
        let merge_total = merges.iter().map(|m| m.amount).sum::<Decimal>();
        let payouts = redemptions.iter().map(|r| r.payout).sum::<Decimal>();
        let wins = redemptions
            .iter()
            .filter(|r| r.payout > Decimal::ZERO)
            .count();

        let pnl = merge_total + payouts - split_total;
        let volume = split_total + merge_total + payouts;

        tracing::debug!(
            wallet,
            splits = splits.len(),
            merges = merges.len(),
            redemptions = redemptions.len(),
            %pnl,
            %volume,
            "aggregated on-chain metrics"
        );

        Ok(WalletMetrics::new(wallet, pnl, volume, win_rate(wins, redemptions.len()))
            .with_auxiliary_volume(payouts)
            .with_truncated(splits_cut || merges_cut || redemptions_cut))
    }
}
