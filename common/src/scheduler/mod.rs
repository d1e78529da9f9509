// Scheduler module for recurring sync jobs
// One repeating timer per auto-sync job, rebuilt from a registry snapshot

pub mod engine;

pub use engine::{Scheduler, DEFAULT_PERIOD_UNIT};
