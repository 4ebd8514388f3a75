mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::time::Instant;

use common::{graphql_field, graphql_page, ok, pagination_config, paginator, rest_page, status, ScriptedTransport};
use polyscan::errors::{FetchError, GradeError};
use polyscan::intelligence::{ActivityMetricsSource, MetricsSource, OnChainMetricsSource, ScoringStrategy};
use polyscan::polymarket::{ApiRequest, DataClient, RawResponse, SubgraphClient};
use polyscan::services::{grade_wallets, write_report, GradeOptions};

fn activity(kind: &str, side: &str, usdc: i64) -> Value {
    json!({
        "proxyWallet": "0xabc",
        "timestamp": 1_700_000_000,
        "type": kind,
        "usdcSize": usdc,
        "side": side,
    })
}

/// Data API for a single wallet: two trades, two redemptions, a value snapshot.
fn data_api(req: &ApiRequest) -> RawResponse {
    let trades = vec![activity("TRADE", "BUY", 100), activity("TRADE", "SELL", 60)];
    let redeems = vec![activity("REDEEM", "", 50), activity("REDEEM", "", 0)];
    match (req.url(), req.query_value("type")) {
        ("https://data-api.test/activity", Some("TRADE")) => rest_page(&trades, req),
        ("https://data-api.test/activity", Some("REDEEM")) => rest_page(&redeems, req),
        ("https://data-api.test/value", _) => ok(json!([{ "user": "0xabc", "value": 80 }])),
        _ => status(404),
    }
}

fn activity_source(transport: &Arc<ScriptedTransport>) -> ActivityMetricsSource {
    ActivityMetricsSource::new(DataClient::new(
        paginator(transport),
        "https://data-api.test",
        pagination_config(500, 10),
    ))
}

fn onchain_source(transport: &Arc<ScriptedTransport>, page_size: u32, max_pages: u32) -> OnChainMetricsSource {
    OnChainMetricsSource::new(SubgraphClient::new(
        paginator(transport),
        "https://subgraph.test",
        page_size,
        max_pages,
    ))
}

fn options(strategy: ScoringStrategy, concurrency: usize) -> GradeOptions {
    GradeOptions {
        strategy,
        concurrency,
        wallet_delay: Duration::from_millis(500),
    }
}

#[tokio::test(start_paused = true)]
async fn test_activity_source_aggregates_trade_log() {
    let transport = ScriptedTransport::new(data_api);

    let metrics = activity_source(&transport).aggregate("0xABC").await.unwrap();

    // profit = proceeds + value - spend = 60 + 80 - 100
    assert_eq!(metrics.profit, Decimal::from(40));
    assert_eq!(metrics.volume, Decimal::from(160));
    assert_eq!(metrics.roi, Decimal::new(25, 2));
    assert_eq!(metrics.win_rate, Decimal::new(5, 1));
    assert_eq!(metrics.auxiliary_volume, Decimal::from(50));
    assert!(!metrics.truncated);
    assert_eq!(metrics.wallet, "0xABC");

    assert!(transport
        .requests()
        .iter()
        .all(|r| r.query_value("user") == Some("0xabc")));
}

#[tokio::test(start_paused = true)]
async fn test_missing_value_snapshot_counts_as_zero() {
    let transport = ScriptedTransport::new(|req| match req.url() {
        "https://data-api.test/value" => status(500),
        _ => data_api(req),
    });

    let metrics = activity_source(&transport).aggregate("0xabc").await.unwrap();
    assert_eq!(metrics.profit, Decimal::from(-40));
}

fn subgraph(req: &ApiRequest) -> RawResponse {
    let splits = vec![json!({ "id": "s1", "timestamp": "1", "amount": "2000000" })];
    let merges = vec![json!({ "id": "m1", "timestamp": "2", "amount": "500000" })];
    let redemptions = vec![
        json!({ "id": "r1", "timestamp": "3", "payout": "3000000" }),
        json!({ "id": "r2", "timestamp": "4", "payout": "0" }),
    ];
    match graphql_field(req) {
        Some("splits") => graphql_page("splits", &splits, req),
        Some("merges") => graphql_page("merges", &merges, req),
        Some("redemptions") => graphql_page("redemptions", &redemptions, req),
        _ => status(400),
    }
}

#[tokio::test(start_paused = true)]
async fn test_onchain_source_scales_raw_amounts() {
    let transport = ScriptedTransport::new(subgraph);

    let metrics = onchain_source(&transport, 100, 10).aggregate("0xabc").await.unwrap();

    // pnl = merges + payouts - splits = 0.5 + 3 - 2
    assert_eq!(metrics.profit, Decimal::new(15, 1));
    assert_eq!(metrics.volume, Decimal::new(55, 1));
    assert_eq!(metrics.win_rate, Decimal::new(5, 1));
    assert_eq!(metrics.auxiliary_volume, Decimal::from(3));
    assert!(!metrics.truncated);
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_onchain_history_past_page_cap_is_flagged() {
    let splits: Vec<Value> = (0..50)
        .map(|i| json!({ "id": format!("s{i}"), "amount": "1000000" }))
        .collect();
    let transport = ScriptedTransport::new(move |req| match graphql_field(req) {
        Some("splits") => graphql_page("splits", &splits, req),
        Some(field) => graphql_page(field, &[], req),
        None => status(400),
    });

    let metrics = onchain_source(&transport, 10, 2).aggregate("0xabc").await.unwrap();

    assert!(metrics.truncated);
    assert_eq!(metrics.volume, Decimal::from(20));
    assert_eq!(metrics.profit, Decimal::from(-20));
}

#[tokio::test(start_paused = true)]
async fn test_graphql_errors_keep_partial_history() {
    let transport = ScriptedTransport::new(|req| match graphql_field(req) {
        Some("merges") => ok(json!({ "errors": [{ "message": "indexer lagging" }] })),
        _ => subgraph(req),
    });

    let metrics = onchain_source(&transport, 100, 10).aggregate("0xabc").await.unwrap();

    assert_eq!(metrics.profit, Decimal::from(1));
    assert!(!metrics.truncated);
}

/// Metrics keyed on the wallet name: `"<profit>:<volume>"`.
struct Fixed;

#[async_trait::async_trait]
impl MetricsSource for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn aggregate(&self, wallet: &str) -> Result<polyscan::models::WalletMetrics, FetchError> {
        if wallet == "throttled" {
            return Err(FetchError::RateLimited { attempts: 4 });
        }
        let (profit, volume) = wallet.split_once(':').unwrap();
        Ok(polyscan::models::WalletMetrics::new(
            wallet,
            profit.parse().unwrap(),
            volume.parse().unwrap(),
            Decimal::new(5, 1),
        ))
    }
}

fn wallets(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_linear_pipeline_filters_and_writes_both_orderings() {
    let list = wallets(&["500:1000", "0:500", "900:0", "-5:100", "5000:20000"]);

    let report = grade_wallets(&Fixed, &list, &options(ScoringStrategy::LinearClamped, 2))
        .await
        .unwrap();

    let graded: Vec<&str> = report.graded.iter().map(|g| g.wallet.as_str()).collect();
    assert_eq!(graded, vec!["500:1000", "5000:20000"]);
    assert_eq!(report.filtered, 3);
    assert_eq!(report.graded[0].score, 22.2);
    assert_eq!(report.sorted[0].wallet, "5000:20000");

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("grades.csv");
    let sorted_out = dir.path().join("grades_sorted.csv");
    write_report(&report, ScoringStrategy::LinearClamped, &out, &sorted_out).unwrap();

    let unsorted = std::fs::read_to_string(&out).unwrap();
    let sorted = std::fs::read_to_string(&sorted_out).unwrap();
    assert!(unsorted.starts_with("# Note:"));
    assert_eq!(unsorted.lines().nth(1), Some("wallet,pnl,win_rate,volume,roi,score"));
    assert!(unsorted.find("500:1000").unwrap() < unsorted.find("5000:20000").unwrap());
    assert!(sorted.find("5000:20000").unwrap() < sorted.find("500:1000").unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_saturation_pipeline_keeps_every_wallet() {
    let list = wallets(&["0:0", "-100:1000", "200:1000"]);

    let report = grade_wallets(&Fixed, &list, &options(ScoringStrategy::BoundedSaturation, 1))
        .await
        .unwrap();

    assert_eq!(report.graded.len(), 3);
    assert_eq!(report.graded[0].score, 50.0);
    assert_eq!(report.sorted[0].wallet, "200:1000");
    assert_eq!(report.sorted[2].wallet, "-100:1000");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_wallet_aborts_run() {
    let list = wallets(&["10:100", "throttled", "20:100"]);

    let err = grade_wallets(&Fixed, &list, &options(ScoringStrategy::LinearClamped, 1))
        .await
        .unwrap_err();

    match err {
        GradeError::Fetch { wallet, source } => {
            assert_eq!(wallet, "throttled");
            assert!(source.is_rate_limited());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_lanes_pause_between_wallets() {
    let list = wallets(&["1:10", "2:10", "3:10", "4:10"]);

    let started = Instant::now();
    let report = grade_wallets(&Fixed, &list, &options(ScoringStrategy::BoundedSaturation, 2))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // Two lanes, two wallets each; no pause after the final wallet.
    assert!(elapsed >= Duration::from_millis(1_000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1_500), "elapsed {elapsed:?}");
    let order: Vec<&str> = report.graded.iter().map(|g| g.wallet.as_str()).collect();
    assert_eq!(order, vec!["1:10", "2:10", "3:10", "4:10"]);
}
