// Sync orchestrator: owns the registry, event bus, runner and scheduler
// Every registry mutation and the scheduler reconfigure that follows it run
// under one lock, so the timer set always matches the latest job set.

use crate::events::{EventBus, EventSubscriber, SubscriptionId, SyncEvent};
use crate::executor::ProcessLauncher;
use crate::models::SyncJob;
use crate::registry::{JobRegistry, JobSnapshot};
use crate::runner::SyncRunner;
use crate::scheduler::Scheduler;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

/// Public entry point for managing and running sync jobs
///
/// Must be created inside a tokio runtime: recurring timers are spawned on
/// the runtime that was current at construction.
pub struct SyncOrchestrator {
    registry: Arc<JobRegistry>,
    bus: Arc<EventBus>,
    runner: Arc<SyncRunner>,
    scheduler: Scheduler,
    mutations: Mutex<()>,
}

impl SyncOrchestrator {
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(tool: impl Into<String>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self::with_runtime(tool, launcher, Handle::current())
    }

    pub fn with_runtime(
        tool: impl Into<String>,
        launcher: Arc<dyn ProcessLauncher>,
        runtime: Handle,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let bus = Arc::new(EventBus::new());
        let runner = Arc::new(SyncRunner::new(
            tool,
            registry.clone(),
            bus.clone(),
            launcher,
        ));
        let scheduler = Scheduler::new(runner.clone(), runtime);

        Self {
            registry,
            bus,
            runner,
            scheduler,
            mutations: Mutex::new(()),
        }
    }

    /// Change the length of one interval unit (one minute by default)
    pub fn with_period_unit(mut self, period_unit: Duration) -> Self {
        self.scheduler = self.scheduler.with_period_unit(period_unit);
        self
    }

    fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a registry change and rebuild the timers from the result
    fn mutate<T>(&self, change: impl FnOnce(&JobRegistry) -> T) -> T {
        let _guard = self.lock_mutations();
        let result = change(&self.registry);
        self.scheduler.reconfigure(&self.registry.snapshot());
        result
    }

    // ------------------------------------------------------------------
    // Job management
    // ------------------------------------------------------------------

    /// Register a job, replacing any job with the same name
    pub fn add_or_update_job(&self, job: SyncJob) {
        self.mutate(|registry| registry.upsert(job));
    }

    /// Remove a job; an unknown name changes nothing and is not an error
    pub fn remove_job(&self, name: &str) -> bool {
        self.mutate(|registry| registry.remove(name))
    }

    pub fn clear_jobs(&self) {
        self.mutate(JobRegistry::clear);
    }

    /// Replace the whole job set at once, e.g. after reading the job file
    pub fn load_jobs(&self, jobs: impl IntoIterator<Item = SyncJob>) {
        self.mutate(|registry| {
            registry.replace_all(jobs);
            info!(job_count = registry.len(), "Loaded job set");
        });
    }

    pub fn list_jobs(&self) -> JobSnapshot {
        self.registry.snapshot()
    }

    pub fn get_job(&self, name: &str) -> Option<SyncJob> {
        self.registry.get(name)
    }

    /// Jobs that currently have a recurring timer
    pub fn scheduled_jobs(&self) -> Vec<String> {
        self.scheduler.active_jobs()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.runner.is_running(name)
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    pub async fn run_one(&self, name: &str) {
        self.runner.run(name).await;
    }

    pub async fn run_all(&self) {
        self.runner.run_all().await;
    }

    pub async fn run_all_concurrent(&self) {
        self.runner.run_all_concurrent().await;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn subscribe<S>(&self, subscriber: S) -> SubscriptionId
    where
        S: EventSubscriber + 'static,
    {
        self.bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Receive events through a channel instead of a callback
    pub fn event_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<SyncEvent>) {
        self.bus.channel()
    }

    /// Stop every timer and wait for scheduled runs in progress
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
