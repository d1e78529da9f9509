use serde::{Deserialize, Serialize};

/// A run lifecycle notification
///
/// Serialized with a `type` tag so subscribers can forward events as JSON:
/// `{"type":"finished","job":"docs","success":true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Started { job: String },
    /// Declared for observers; the runner does not emit it.
    Progress { job: String, percent: u8 },
    Finished { job: String, success: bool },
    Error { job: String, message: String },
}

impl SyncEvent {
    pub fn started(job: impl Into<String>) -> Self {
        SyncEvent::Started { job: job.into() }
    }

    pub fn progress(job: impl Into<String>, percent: u8) -> Self {
        SyncEvent::Progress {
            job: job.into(),
            percent: percent.min(100),
        }
    }

    pub fn finished(job: impl Into<String>, success: bool) -> Self {
        SyncEvent::Finished {
            job: job.into(),
            success,
        }
    }

    pub fn error(job: impl Into<String>, message: impl Into<String>) -> Self {
        SyncEvent::Error {
            job: job.into(),
            message: message.into(),
        }
    }

    /// Name of the job this event describes
    pub fn job(&self) -> &str {
        match self {
            SyncEvent::Started { job }
            | SyncEvent::Progress { job, .. }
            | SyncEvent::Finished { job, .. }
            | SyncEvent::Error { job, .. } => job,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Started { .. } => "started",
            SyncEvent::Progress { .. } => "progress",
            SyncEvent::Finished { .. } => "finished",
            SyncEvent::Error { .. } => "error",
        }
    }

    /// Whether this event ends a run (`Finished`)
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncEvent::Finished { .. })
    }
}
