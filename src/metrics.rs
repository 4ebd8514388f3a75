use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and register all scanner metrics.
///
/// With `listen` set, a scrape endpoint is served on that address for the
/// life of the process; otherwise the recorder only collects in memory.
pub fn init_metrics(listen: Option<SocketAddr>) -> anyhow::Result<()> {
    match listen {
        Some(addr) => {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(|e| anyhow::anyhow!("failed to install Prometheus exporter on {addr}: {e}"))?;
            tracing::info!(%addr, "Prometheus exporter listening");
        }
        None => {
            PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;
        }
    }

    // Pre-register counters so they appear even before the first increment.
    counter!("pages_fetched_total").absolute(0);
    counter!("rate_limited_total").absolute(0);
    counter!("records_skipped_total").absolute(0);
    counter!("wallets_discovered_total").absolute(0);
    counter!("wallets_graded_total").absolute(0);

    gauge!("known_wallets").set(0.0);

    Ok(())
}
