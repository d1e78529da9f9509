// Telemetry module for structured logging and metrics

use crate::config::LogFormat;
use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging
///
/// `RUST_LOG` takes precedence over `log_level` when set. JSON output carries
/// the current span (job name, run id) on every line.
pub fn init_logging(log_level: &str, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(env_filter);
            registry
                .with(json_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
        }
        LogFormat::Pretty => {
            let human_layer = fmt::layer().with_target(false).with_filter(env_filter);
            registry
                .with(human_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;
        }
    }

    tracing::info!(log_level = log_level, format = ?format, "Logging initialized");

    Ok(())
}

/// Initialize Prometheus metrics exporter
///
/// Registers:
/// - sync_success_total: successful runs
/// - sync_failed_total: failed runs, labelled by reason
/// - sync_duration_seconds: run duration
/// - sync_events_total: emitted events, labelled by kind
/// - sync_running_jobs: runs currently executing
#[tracing::instrument]
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("127.0.0.1:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!("sync_success_total", "Total number of successful sync runs");
    describe_counter!("sync_failed_total", "Total number of failed sync runs");
    describe_histogram!("sync_duration_seconds", "Duration of sync runs in seconds");
    describe_counter!("sync_events_total", "Total number of emitted sync events");
    describe_gauge!("sync_running_jobs", "Number of sync runs currently executing");

    tracing::info!(
        metrics_endpoint = format!("http://{}/metrics", addr),
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

#[inline]
pub fn record_sync_success(job_name: &str) {
    counter!("sync_success_total", "job_name" => job_name.to_string()).increment(1);
}

#[inline]
pub fn record_sync_failure(job_name: &str, reason: &str) {
    counter!(
        "sync_failed_total",
        "job_name" => job_name.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[inline]
pub fn record_sync_duration(job_name: &str, duration_seconds: f64) {
    histogram!("sync_duration_seconds", "job_name" => job_name.to_string())
        .record(duration_seconds);
}

#[inline]
pub fn record_event(job_name: &str, kind: &'static str) {
    counter!(
        "sync_events_total",
        "job_name" => job_name.to_string(),
        "kind" => kind
    )
    .increment(1);
}

#[inline]
pub fn update_running_jobs(count: usize) {
    gauge!("sync_running_jobs").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_only_once() {
        let _ = init_logging("info", LogFormat::Pretty);
        assert!(init_logging("debug", LogFormat::Json).is_err());
    }

    #[test]
    fn test_metrics_recording() {
        record_sync_success("docs");
        record_sync_failure("docs", "process_failed");
        record_sync_duration("docs", 1.5);
        record_event("docs", "started");
        update_running_jobs(2);
    }
}
