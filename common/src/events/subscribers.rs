// Built-in event subscribers: structured logging and metrics

use super::bus::EventSubscriber;
use super::event::SyncEvent;
use crate::telemetry;
use tracing::{error, info, warn};

/// Writes every event to the tracing subscriber
///
/// Stands in for the status indicator of the desktop front end: an operator
/// tailing the logs sees the same start/finish/error sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSubscriber;

impl EventSubscriber for LogSubscriber {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Started { job } => {
                info!(job_name = %job, "Sync started");
            }
            SyncEvent::Progress { job, percent } => {
                info!(job_name = %job, percent, "Sync progress");
            }
            SyncEvent::Finished { job, success: true } => {
                info!(job_name = %job, "Sync finished");
            }
            SyncEvent::Finished { job, success: false } => {
                warn!(job_name = %job, "Sync finished with errors");
            }
            SyncEvent::Error { job, message } => {
                error!(job_name = %job, message = %message.trim_end(), "Sync error");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Counts events per kind in `sync_events_total`
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSubscriber;

impl EventSubscriber for MetricsSubscriber {
    fn on_event(&self, event: &SyncEvent) {
        telemetry::record_event(event.job(), event.kind());
    }

    fn name(&self) -> &str {
        "metrics"
    }
}
