// Error handling framework
// Every variant of SyncError is reported through a SyncEvent::Error; none of
// them is ever returned from SyncRunner::run.

use thiserror::Error;

/// Sync run errors
///
/// The `Display` text of each variant is the exact message carried by the
/// corresponding `Error` event, so observers can match on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Sync job not found")]
    JobNotFound,

    #[error("Source directory does not exist: {0}")]
    SourceNotFound(String),

    #[error("{stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("{0}")]
    SpawnFailed(String),

    #[error("Sync job is already running")]
    AlreadyRunning,
}

impl SyncError {
    /// Short machine-friendly label used for metrics and log fields
    pub fn reason(&self) -> &'static str {
        match self {
            SyncError::JobNotFound => "job_not_found",
            SyncError::SourceNotFound(_) => "source_not_found",
            SyncError::ProcessFailed { .. } => "process_failed",
            SyncError::SpawnFailed(_) => "spawn_failed",
            SyncError::AlreadyRunning => "already_running",
        }
    }
}

/// Persisted job document errors
#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("Failed to access job file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid job file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}
