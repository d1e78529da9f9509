// Common library for the sync job orchestrator and its daemon

pub mod config;
pub mod config_store;
pub mod errors;
pub mod events;
pub mod executor;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod telemetry;

pub use orchestrator::SyncOrchestrator;
