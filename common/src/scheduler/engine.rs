// Scheduler engine: repeating per-job timers driving SyncRunner::run

use crate::models::SyncJob;
use crate::runner::SyncRunner;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

/// Length of one `interval` unit: job intervals are in minutes
pub const DEFAULT_PERIOD_UNIT: Duration = Duration::from_secs(60);

/// Timers created by one `reconfigure` call
#[derive(Default)]
struct TimerSet {
    shutdown_tx: Option<broadcast::Sender<()>>,
    jobs: Vec<String>,
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    /// Signal every timer to stop and hand back their tasks
    fn cancel(&mut self) -> Vec<JoinHandle<()>> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.jobs.clear();
        std::mem::take(&mut self.handles)
    }
}

/// Keeps one repeating timer per job with `auto_sync` and a positive interval
///
/// Timers are spawned on the runtime handle given at construction. The first
/// firing happens one full period after the timer is created; a firing that
/// comes due while the previous run is still going is delayed, never queued
/// twice.
pub struct Scheduler {
    runner: Arc<SyncRunner>,
    runtime: Handle,
    period_unit: Duration,
    timers: Mutex<TimerSet>,
}

impl Scheduler {
    pub fn new(runner: Arc<SyncRunner>, runtime: Handle) -> Self {
        Self {
            runner,
            runtime,
            period_unit: DEFAULT_PERIOD_UNIT,
            timers: Mutex::new(TimerSet::default()),
        }
    }

    /// Shorten the interval unit, e.g. to seconds in tests
    pub fn with_period_unit(mut self, period_unit: Duration) -> Self {
        self.period_unit = period_unit;
        self
    }

    fn timers(&self) -> MutexGuard<'_, TimerSet> {
        self.timers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace every timer with a fresh set built from `jobs`
    ///
    /// Cancelled timers do not abort a run already in progress; the run
    /// completes and its timer then exits.
    #[instrument(skip_all, fields(job_count = jobs.len()))]
    pub fn reconfigure(&self, jobs: &[SyncJob]) {
        let mut timers = self.timers();
        let cancelled = timers.cancel();
        debug!(cancelled = cancelled.len(), "Cancelled previous timers");

        let scheduled: Vec<&SyncJob> = jobs.iter().filter(|job| job.is_scheduled()).collect();
        if scheduled.is_empty() {
            info!("No recurring sync jobs");
            return;
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        for job in scheduled {
            // tokio intervals reject a zero period
            let period = self
                .period_unit
                .saturating_mul(job.interval)
                .max(Duration::from_millis(1));
            let handle = self.runtime.spawn(drive_timer(
                self.runner.clone(),
                job.name.clone(),
                period,
                shutdown_tx.subscribe(),
            ));
            timers.jobs.push(job.name.clone());
            timers.handles.push(handle);
        }
        timers.shutdown_tx = Some(shutdown_tx);

        info!(scheduled = timers.jobs.len(), "Scheduler reconfigured");
    }

    /// Names of the jobs that currently have a timer, in registry order
    pub fn active_jobs(&self) -> Vec<String> {
        self.timers().jobs.clone()
    }

    /// Cancel every timer and wait for in-flight scheduled runs to finish
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let handles = self.timers().cancel();
        info!(timers = handles.len(), "Stopping scheduler");

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler timer task failed");
            }
        }

        info!("Scheduler stopped");
    }
}

#[instrument(skip(runner, shutdown_rx), fields(period_seconds = period.as_secs()))]
async fn drive_timer(
    runner: Arc<SyncRunner>,
    job_name: String,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                debug!("Timer cancelled");
                break;
            }
            _ = ticker.tick() => {
                debug!("Timer fired");
                runner.run(&job_name).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::executor::{ProcessLauncher, ProcessOutput, SyncCommand};
    use crate::registry::JobRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::time::sleep;

    #[derive(Default)]
    struct CountingLauncher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProcessLauncher for CountingLauncher {
        async fn launch(&self, _command: &SyncCommand) -> std::io::Result<ProcessOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProcessOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    struct Fixture {
        source: TempDir,
        registry: Arc<JobRegistry>,
        launcher: Arc<CountingLauncher>,
        scheduler: Scheduler,
    }

    impl Fixture {
        fn new() -> Self {
            let source = TempDir::new().unwrap();
            let registry = Arc::new(JobRegistry::new());
            let launcher = Arc::new(CountingLauncher::default());
            let runner = Arc::new(SyncRunner::new(
                "rsync",
                registry.clone(),
                Arc::new(EventBus::new()),
                launcher.clone(),
            ));
            let scheduler = Scheduler::new(runner, Handle::current())
                .with_period_unit(Duration::from_secs(1));
            Self {
                source,
                registry,
                launcher,
                scheduler,
            }
        }

        fn job(&self, name: &str) -> SyncJob {
            SyncJob::new(name, self.source.path().to_string_lossy(), "/tmp/dst")
        }

        fn load(&self, jobs: Vec<SyncJob>) {
            self.registry.replace_all(jobs);
            self.scheduler.reconfigure(&self.registry.snapshot());
        }

        fn calls(&self) -> usize {
            self.launcher.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_recurring_jobs_get_timers() {
        let fixture = Fixture::new();
        fixture.load(vec![
            fixture.job("manual"),
            fixture.job("zero").with_auto_sync(0),
            fixture.job("hourly").with_auto_sync(60),
            fixture.job("often").with_auto_sync(1),
        ]);

        assert_eq!(fixture.scheduler.active_jobs(), vec!["hourly", "often"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_firing_is_one_period_after_configuration() {
        let fixture = Fixture::new();
        fixture.load(vec![fixture.job("docs").with_auto_sync(2)]);

        sleep(Duration::from_millis(1900)).await;
        assert_eq!(fixture.calls(), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(fixture.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_keeps_firing_every_period() {
        let fixture = Fixture::new();
        fixture.load(vec![fixture.job("docs").with_auto_sync(1)]);

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(fixture.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_replaces_timer_set() {
        let fixture = Fixture::new();
        fixture.load(vec![fixture.job("a").with_auto_sync(1)]);
        fixture.load(vec![fixture.job("b")]);

        assert!(fixture.scheduler.active_jobs().is_empty());
        sleep(Duration::from_secs(5)).await;
        assert_eq!(fixture.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_restarts_the_period() {
        let fixture = Fixture::new();
        fixture.load(vec![fixture.job("docs").with_auto_sync(2)]);

        sleep(Duration::from_millis(1500)).await;
        fixture.load(vec![fixture.job("docs").with_auto_sync(2)]);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(fixture.calls(), 0);

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(fixture.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_timers() {
        let fixture = Fixture::new();
        fixture.load(vec![
            fixture.job("a").with_auto_sync(1),
            fixture.job("b").with_auto_sync(1),
        ]);

        fixture.scheduler.shutdown().await;
        assert!(fixture.scheduler.active_jobs().is_empty());

        sleep(Duration::from_secs(3)).await;
        assert_eq!(fixture.calls(), 0);
    }
}
