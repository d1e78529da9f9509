use crate::errors::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Options used when a job is created without explicit tool arguments
pub const DEFAULT_OPTIONS: &[&str] = &["-av", "--delete"];

/// Default auto-sync period, in minutes
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

// ============================================================================
// Job Models
// ============================================================================

/// SyncJob is a named synchronization task definition
///
/// Serialized field names follow the persisted job document
/// (`source_dir` / `dest_dir`). Missing fields fall back to empty strings,
/// no options, `auto_sync = false` and a 60 minute interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "source_dir", default)]
    pub source_path: String,
    #[serde(rename = "dest_dir", default)]
    pub destination_path: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_interval")]
    pub interval: u32,
}

impl SyncJob {
    /// Create a job with the default options and no recurring schedule
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            options: DEFAULT_OPTIONS.iter().map(|s| s.to_string()).collect(),
            auto_sync: false,
            interval: DEFAULT_INTERVAL_MINUTES,
        }
    }

    /// Replace the tool options
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Enable recurring execution every `interval` minutes
    pub fn with_auto_sync(mut self, interval: u32) -> Self {
        self.auto_sync = true;
        self.interval = interval;
        self
    }

    /// Whether the scheduler should keep a timer for this job
    pub fn is_scheduled(&self) -> bool {
        self.auto_sync && self.interval > 0
    }

    /// Check the fields a job form is expected to enforce
    ///
    /// The orchestrator itself accepts any job; this is for the
    /// collaborators that build jobs from user input or files.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        if self.source_path.trim().is_empty() {
            return Err(ValidationError::MissingField("source_dir".to_string()));
        }
        if self.destination_path.trim().is_empty() {
            return Err(ValidationError::MissingField("dest_dir".to_string()));
        }
        if self.auto_sync && self.interval == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "interval".to_string(),
                reason: "must be greater than 0 when auto_sync is enabled".to_string(),
            });
        }
        Ok(())
    }
}

/// Split a free-form options string into tool arguments
///
/// Splitting is on whitespace only: quotes are not interpreted, so
/// `--exclude "a b"` yields three tokens.
pub fn parse_options(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

// ============================================================================
// Run Models
// ============================================================================

/// Final classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failure,
}

/// SyncRun is the transient record of one execution attempt
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub stderr: String,
    pub outcome: Option<RunOutcome>,
}

impl SyncRun {
    pub fn start(job_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            started_at: Utc::now(),
            exit_code: None,
            stderr: String::new(),
            outcome: None,
        }
    }

    /// Seconds elapsed since the run started
    pub fn elapsed_seconds(&self) -> f64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds().max(0) as f64 / 1000.0
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Some(RunOutcome::Success))
    }
}
