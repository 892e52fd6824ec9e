// Telemetry module for structured logging and metrics

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting
///
/// Log levels come from `RUST_LOG` when set, falling back to the
/// configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_thread_ids(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level, "Structured logging initialized");
    Ok(())
}

/// Initialize the Prometheus metrics exporter and describe all metrics
///
/// - `poller_cycles_total`: counter of completed poll cycles
/// - `poller_rows_appended_total`: counter of stats rows appended
/// - `poller_cycle_duration_seconds`: histogram of work-unit duration
/// - `poller_reloads_total`: counter of applied configuration reloads
/// - `poller_state`: gauge, 1 while a cycle is running and 0 while idle
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!("poller_cycles_total", "Total number of completed poll cycles");
    describe_counter!(
        "poller_rows_appended_total",
        "Total number of rows appended to the statistics table"
    );
    describe_histogram!(
        "poller_cycle_duration_seconds",
        "Duration of the work unit per cycle in seconds"
    );
    describe_counter!(
        "poller_reloads_total",
        "Number of configuration reloads applied"
    );
    describe_gauge!(
        "poller_state",
        "1 while a cycle is running, 0 while the poller is idle"
    );

    tracing::info!(metrics_port, "Prometheus metrics exporter initialized");
    Ok(())
}

/// Record one completed poll cycle
#[inline]
pub fn record_cycle(rows_appended: u64, duration_seconds: f64) {
    counter!("poller_cycles_total").increment(1);
    counter!("poller_rows_appended_total").increment(rows_appended);
    histogram!("poller_cycle_duration_seconds").record(duration_seconds);
}

/// Record an applied configuration reload
#[inline]
pub fn record_reload() {
    counter!("poller_reloads_total").increment(1);
}

/// Report the coarse running/idle state
///
/// The standalone analogue of per-backend activity reporting: consumers
/// scrape the gauge instead of reading a process title.
#[inline]
pub fn set_state_running(running: bool) {
    gauge!("poller_state").set(if running { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_does_not_panic() {
        // Without an installed recorder these are no-ops.
        record_cycle(3, 0.25);
        record_reload();
        set_state_running(true);
        set_state_running(false);
    }

    #[test]
    fn test_init_logging_with_valid_level() {
        let result = init_logging("info");
        // Either succeeds or a subscriber is already installed by
        // another test in this process.
        assert!(result.is_ok() || result.is_err());
    }
}
