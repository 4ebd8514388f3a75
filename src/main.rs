use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use polyscan::config::AppConfig;
use polyscan::intelligence::{ActivityMetricsSource, MetricsSource, OnChainMetricsSource, ScoringStrategy};
use polyscan::models::{PrecomputedMetrics, WalletMetrics};
use polyscan::polymarket::{DataClient, Fetcher, HttpTransport, Paginator, SubgraphClient};
use polyscan::services::{self, DiscoveryJob, GradeOptions};
use polyscan::store::{read_wallet_list, CheckpointStore};

#[derive(Parser)]
#[command(name = "polyscan", about = "Polymarket wallet discovery and Smart-Score grading")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the public trade feed and record wallets not seen before
    Discover {
        /// Run a single scan and exit instead of scheduling
        #[arg(long)]
        once: bool,
    },
    /// Fetch metrics for a wallet list and write graded CSV files
    Grade {
        /// Newline-delimited wallet list (defaults to the discovery wallet file)
        #[arg(long)]
        wallets: Option<PathBuf>,

        /// Only grade the first N wallets
        #[arg(long)]
        limit: Option<usize>,

        /// Where wallet metrics come from
        #[arg(long, value_enum, default_value_t = Source::Activity)]
        source: Source,

        /// Scoring formula (defaults to saturation for activity, linear for onchain)
        #[arg(long)]
        strategy: Option<ScoringStrategy>,

        /// Wallets aggregated concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        sorted_out: Option<PathBuf>,
    },
    /// Score a precomputed metrics dump with the linear formula
    Score {
        #[arg(long, default_value = "raw_data.json")]
        input: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        sorted_out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Activity,
    Onchain,
}

impl Source {
    fn default_strategy(self) -> ScoringStrategy {
        match self {
            Source::Activity => ScoringStrategy::BoundedSaturation,
            Source::Onchain => ScoringStrategy::LinearClamped,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(config.json_logs);
    polyscan::metrics::init_metrics(config.metrics_addr)?;

    let transport = Arc::new(HttpTransport::new(config.fetcher.request_timeout)?);
    let fetcher = Fetcher::new(transport, config.fetcher.clone());
    let paginator = Paginator::new(fetcher, config.pagination.page_delay);

    match cli.command {
        Command::Discover { once } => discover(&config, paginator, once).await,
        Command::Grade {
            wallets,
            limit,
            source,
            strategy,
            concurrency,
            out,
            sorted_out,
        } => {
            let wallets_file = wallets.unwrap_or_else(|| config.discovery.seen_users_file.clone());
            let wallets = read_wallet_list(&wallets_file, limit)
                .with_context(|| format!("failed to read wallet list {}", wallets_file.display()))?;

            let metrics_source: Box<dyn MetricsSource> = match source {
                Source::Activity => Box::new(ActivityMetricsSource::new(DataClient::new(
                    paginator,
                    config.data_api_url.clone(),
                    config.pagination.clone(),
                ))),
                Source::Onchain => Box::new(OnChainMetricsSource::new(SubgraphClient::new(
                    paginator,
                    config.subgraph_url.clone(),
                    config.pagination.subgraph_page_size,
                    config.pagination.aux_max_pages,
                ))),
            };

            let options = GradeOptions {
                strategy: strategy.unwrap_or(source.default_strategy()),
                concurrency: concurrency.unwrap_or(config.grading.concurrency).max(1),
                wallet_delay: config.grading.wallet_delay,
            };
            let out = out.unwrap_or_else(|| config.grading.output_file.clone());
            let sorted_out = sorted_out.unwrap_or_else(|| config.grading.sorted_output_file.clone());

            grade(metrics_source.as_ref(), &wallets, &options, &out, &sorted_out).await
        }
        Command::Score {
            input,
            out,
            sorted_out,
        } => {
            let out = out.unwrap_or_else(|| config.grading.output_file.clone());
            let sorted_out = sorted_out.unwrap_or_else(|| config.grading.sorted_output_file.clone());
            score_precomputed(&input, &out, &sorted_out)
        }
    }
}

async fn discover(config: &AppConfig, paginator: Paginator, once: bool) -> anyhow::Result<()> {
    let client = DataClient::new(paginator, config.data_api_url.clone(), config.pagination.clone());
    let store = CheckpointStore::from_config(&config.discovery);
    let job = DiscoveryJob::new(client, store);

    tracing::info!("Polymarket wallet monitor started");

    if once {
        tokio::select! {
            result = job.tick() => {
                result.context("discovery cycle failed")?;
            }
            _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted by user"),
        }
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };
    services::run_discovery_loop(&job, config.discovery.scan_interval, shutdown).await;
    Ok(())
}

async fn grade(
    source: &dyn MetricsSource,
    wallets: &[String],
    options: &GradeOptions,
    out: &Path,
    sorted_out: &Path,
) -> anyhow::Result<()> {
    tracing::info!(
        wallets = wallets.len(),
        source = source.name(),
        strategy = %options.strategy,
        "Grading wallets"
    );

    let report = tokio::select! {
        result = services::grade_wallets(source, wallets, options) => result?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted by user"),
    };

    services::write_report(&report, options.strategy, out, sorted_out)?;
    tracing::info!(
        graded = report.graded.len(),
        filtered = report.filtered,
        truncated = report.truncated,
        "Done"
    );
    Ok(())
}

fn score_precomputed(input: &Path, out: &Path, sorted_out: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let entries: Vec<PrecomputedMetrics> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let metrics: Vec<WalletMetrics> = entries.into_iter().map(WalletMetrics::from).collect();

    let strategy = ScoringStrategy::LinearClamped;
    let report = services::grade(&metrics, strategy);
    services::write_report(&report, strategy, out, sorted_out)?;
    tracing::info!(
        graded = report.graded.len(),
        filtered = report.filtered,
        "Done"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
