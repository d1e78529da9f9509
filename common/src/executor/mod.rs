// Executor module for launching the external sync tool
// Provides the launcher trait, the command model, and the tokio implementation

pub mod process;

use crate::models::SyncJob;
use async_trait::async_trait;
use std::fmt;

pub use process::TokioProcessLauncher;

/// Full command line for one run: `program args...`
///
/// For a job the arguments are the job options in order, then the source,
/// then the destination. The destination is always the last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SyncCommand {
    pub fn for_job(tool: &str, job: &SyncJob) -> Self {
        let mut args = Vec::with_capacity(job.options.len() + 2);
        args.extend(job.options.iter().cloned());
        args.push(job.source_path.clone());
        args.push(job.destination_path.clone());

        Self {
            program: tool.to_string(),
            args,
        }
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Captured result of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// ProcessLauncher runs a command to completion
///
/// `Err` means the process could not be started at all; a process that
/// started and exited non-zero is an `Ok` with that exit code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, command: &SyncCommand) -> std::io::Result<ProcessOutput>;
}
