// Sync runner: validates a job, launches the tool, reports the run as events
//
// Event contract per call to `run`:
// - unknown job / missing source / job already running: a single Error
// - otherwise: Started, then either Finished(true) or Error + Finished(false)

use crate::errors::SyncError;
use crate::events::{EventBus, SyncEvent};
use crate::executor::{ProcessLauncher, SyncCommand};
use crate::models::{RunOutcome, SyncRun};
use crate::registry::JobRegistry;
use crate::telemetry;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

/// Executes registered jobs one run at a time per job name
pub struct SyncRunner {
    tool: String,
    registry: Arc<JobRegistry>,
    bus: Arc<EventBus>,
    launcher: Arc<dyn ProcessLauncher>,
    running: Mutex<HashSet<String>>,
}

/// Marks a job as executing until dropped
struct RunGuard<'a> {
    runner: &'a SyncRunner,
    name: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut running = self.runner.running_set();
        running.remove(&self.name);
        telemetry::update_running_jobs(running.len());
    }
}

impl SyncRunner {
    pub fn new(
        tool: impl Into<String>,
        registry: Arc<JobRegistry>,
        bus: Arc<EventBus>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            tool: tool.into(),
            registry,
            bus,
            launcher,
            running: Mutex::new(HashSet::new()),
        }
    }

    fn running_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running_set().contains(name)
    }

    /// Names of the jobs currently executing, sorted
    pub fn running_jobs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.running_set().iter().cloned().collect();
        names.sort();
        names
    }

    fn try_begin(&self, name: &str) -> Option<RunGuard<'_>> {
        let mut running = self.running_set();
        if !running.insert(name.to_string()) {
            return None;
        }
        telemetry::update_running_jobs(running.len());
        Some(RunGuard {
            runner: self,
            name: name.to_string(),
        })
    }

    fn reject(&self, name: &str, err: SyncError) {
        warn!(job_name = %name, reason = err.reason(), error = %err, "Sync run rejected");
        telemetry::record_sync_failure(name, err.reason());
        self.bus.emit(SyncEvent::error(name, err.to_string()));
    }

    /// Run one job to completion
    ///
    /// Never fails: every outcome, including a tool that cannot be started,
    /// is reported through the event bus. Waits for the child process with
    /// no timeout.
    #[instrument(skip_all, fields(job_name = %name, run_id = tracing::field::Empty))]
    pub async fn run(&self, name: &str) {
        let Some(job) = self.registry.get(name) else {
            self.reject(name, SyncError::JobNotFound);
            return;
        };

        if !Path::new(&job.source_path).exists() {
            self.reject(name, SyncError::SourceNotFound(job.source_path.clone()));
            return;
        }

        let command = SyncCommand::for_job(&self.tool, &job);

        let Some(_guard) = self.try_begin(name) else {
            self.reject(name, SyncError::AlreadyRunning);
            return;
        };

        let mut run = SyncRun::start(name);
        tracing::Span::current().record("run_id", tracing::field::display(run.id));
        info!(command = %command, "Starting sync");
        self.bus.emit(SyncEvent::started(name));

        let result = match self.launcher.launch(&command).await {
            Ok(output) => {
                debug!(stdout_bytes = output.stdout.len(), "Sync tool exited");
                run.exit_code = output.exit_code;
                run.stderr = output.stderr;
                if run.exit_code == Some(0) {
                    Ok(())
                } else {
                    Err(SyncError::ProcessFailed {
                        code: run.exit_code,
                        stderr: run.stderr.clone(),
                    })
                }
            }
            Err(e) => Err(SyncError::SpawnFailed(e.to_string())),
        };

        let elapsed = run.elapsed_seconds();
        telemetry::record_sync_duration(&run.job_name, elapsed);

        match result {
            Ok(()) => {
                run.outcome = Some(RunOutcome::Success);
                info!(duration_seconds = elapsed, "Sync finished");
                telemetry::record_sync_success(&run.job_name);
            }
            Err(err) => {
                run.outcome = Some(RunOutcome::Failure);
                error!(
                    exit_code = ?run.exit_code,
                    reason = err.reason(),
                    duration_seconds = elapsed,
                    "Sync failed"
                );
                telemetry::record_sync_failure(&run.job_name, err.reason());
                self.bus.emit(SyncEvent::error(&run.job_name, err.to_string()));
            }
        }
        self.bus.emit(SyncEvent::finished(&run.job_name, run.succeeded()));
    }

    /// Run every job in registry order, each to completion before the next
    #[instrument(skip(self))]
    pub async fn run_all(&self) {
        let snapshot = self.registry.snapshot();
        info!(job_count = snapshot.len(), "Running all sync jobs");
        for job in &snapshot {
            self.run(&job.name).await;
        }
    }

    /// Start every job at once and wait for all of them
    ///
    /// Events of different jobs interleave; each job's own events keep their
    /// order.
    #[instrument(skip(self))]
    pub async fn run_all_concurrent(&self) {
        let names: Vec<String> = self
            .registry
            .snapshot()
            .into_iter()
            .map(|job| job.name)
            .collect();
        info!(job_count = names.len(), "Running all sync jobs concurrently");
        join_all(names.iter().map(|name| self.run(name))).await;
    }
}
