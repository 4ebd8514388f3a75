use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATA_API_URL: &str = "https://data-api.polymarket.com";
const DEFAULT_SUBGRAPH_URL: &str =
    "https://api.goldsky.com/api/public/project_cl6mb8i9h0003e201j6li0diw/subgraphs/activity-subgraph/0.0.4/gn";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_api_url: String,
    pub subgraph_url: String,

    pub fetcher: FetcherConfig,
    pub pagination: PaginationConfig,
    pub discovery: DiscoveryConfig,
    pub grading: GradingConfig,

    // Observability
    pub metrics_addr: Option<SocketAddr>,
    pub json_logs: bool,
}

/// Per-request behaviour of the rate-limited fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub request_timeout: Duration,
    /// Total attempts made when the upstream keeps answering 429.
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub trades_page_size: u32,
    pub activity_page_size: u32,
    pub subgraph_page_size: u32,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    /// Ceiling on pages fetched from auxiliary resources.
    pub aux_max_pages: u32,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub scan_interval: Duration,
    pub seen_users_file: PathBuf,
    pub last_check_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Pause between wallets within one worker lane.
    pub wallet_delay: Duration,
    pub concurrency: usize,
    pub output_file: PathBuf,
    pub sorted_output_file: PathBuf,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_attempts: 4,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            trades_page_size: 500,
            activity_page_size: 500,
            subgraph_page_size: 100,
            page_delay: Duration::from_millis(150),
            aux_max_pages: 10,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(4 * 60),
            seen_users_file: PathBuf::from("seen_users.txt"),
            last_check_file: PathBuf::from("last_check.txt"),
        }
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            wallet_delay: Duration::from_millis(500),
            concurrency: 4,
            output_file: PathBuf::from("grades.csv"),
            sorted_output_file: PathBuf::from("grades_sorted.csv"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup; unset keys fall back to
    /// defaults, malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetcher_defaults = FetcherConfig::default();
        let page_defaults = PaginationConfig::default();
        let discovery_defaults = DiscoveryConfig::default();
        let grading_defaults = GradingConfig::default();

        let fetcher = FetcherConfig {
            request_timeout: parsed(&lookup, "HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(fetcher_defaults.request_timeout),
            max_attempts: parsed(&lookup, "RATE_LIMIT_MAX_ATTEMPTS")?
                .unwrap_or(fetcher_defaults.max_attempts),
        };

        let pagination = PaginationConfig {
            trades_page_size: parsed(&lookup, "TRADES_PAGE_SIZE")?
                .unwrap_or(page_defaults.trades_page_size),
            activity_page_size: parsed(&lookup, "ACTIVITY_PAGE_SIZE")?
                .unwrap_or(page_defaults.activity_page_size),
            subgraph_page_size: parsed(&lookup, "SUBGRAPH_PAGE_SIZE")?
                .unwrap_or(page_defaults.subgraph_page_size),
            page_delay: parsed(&lookup, "PAGE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(page_defaults.page_delay),
            aux_max_pages: parsed(&lookup, "AUX_MAX_PAGES")?
                .unwrap_or(page_defaults.aux_max_pages),
        };

        let discovery = DiscoveryConfig {
            scan_interval: parsed::<u64, _>(&lookup, "SCAN_INTERVAL_MIN")?
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(discovery_defaults.scan_interval),
            seen_users_file: lookup("SEEN_USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(discovery_defaults.seen_users_file),
            last_check_file: lookup("LAST_CHECK_FILE")
                .map(PathBuf::from)
                .unwrap_or(discovery_defaults.last_check_file),
        };

        let grading = GradingConfig {
            wallet_delay: parsed(&lookup, "WALLET_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(grading_defaults.wallet_delay),
            concurrency: parsed::<usize, _>(&lookup, "GRADE_CONCURRENCY")?
                .unwrap_or(grading_defaults.concurrency)
                .max(1),
            ..grading_defaults
        };

        if pagination.trades_page_size == 0
            || pagination.activity_page_size == 0
            || pagination.subgraph_page_size == 0
        {
            anyhow::bail!("page sizes must be positive");
        }

        Ok(Self {
            data_api_url: lookup("DATA_API_URL").unwrap_or_else(|| DEFAULT_DATA_API_URL.into()),
            subgraph_url: lookup("SUBGRAPH_URL").unwrap_or_else(|| DEFAULT_SUBGRAPH_URL.into()),
            fetcher,
            pagination,
            discovery,
            grading,
            metrics_addr: parsed(&lookup, "METRICS_ADDR")?,
            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}")),
        _ => Ok(None),
    }
}
