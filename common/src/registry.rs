// In-memory job registry keyed by job name
// Iteration order is insertion order; replacing a job keeps its position.

use crate::models::SyncJob;
use indexmap::IndexMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Ordered, owned copy of the registry contents
pub type JobSnapshot = Vec<SyncJob>;

/// Registry of sync jobs
///
/// Readers never hold the lock across a snapshot: [`JobRegistry::snapshot`]
/// copies the jobs out so callers can iterate while other threads mutate.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<IndexMap<String, SyncJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated:
    // every write is a single IndexMap call.
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, SyncJob>> {
        self.jobs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, SyncJob>> {
        self.jobs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a job, or replace the job with the same name entirely
    pub fn upsert(&self, job: SyncJob) {
        debug!(job_name = %job.name, "Upserting sync job");
        self.write().insert(job.name.clone(), job);
    }

    /// Remove a job by name; returns whether a job was removed
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.write().shift_remove(name).is_some();
        debug!(job_name = %name, removed, "Removing sync job");
        removed
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Atomically replace the whole job set
    pub fn replace_all(&self, jobs: impl IntoIterator<Item = SyncJob>) {
        let fresh: IndexMap<String, SyncJob> =
            jobs.into_iter().map(|job| (job.name.clone(), job)).collect();
        *self.write() = fresh;
    }

    pub fn get(&self, name: &str) -> Option<SyncJob> {
        self.read().get(name).cloned()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
