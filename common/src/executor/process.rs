// Child process launcher backed by tokio::process

use super::{ProcessLauncher, ProcessOutput, SyncCommand};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Maximum stdout or stderr size captured per stream (10 MiB)
///
/// A verbose `-v` transfer can list every file. Output past this limit is
/// still read to EOF, then discarded, so the child never hits a closed pipe.
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Launches the sync tool as a child process
///
/// Stdout and stderr are captured separately; stdin is closed. The call
/// waits for the process without a timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    #[instrument(skip_all, fields(command = %command))]
    async fn launch(&self, command: &SyncCommand) -> std::io::Result<ProcessOutput> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Drain both pipes concurrently with the wait so a chatty child never
        // blocks on a full pipe.
        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let status = child.wait().await?;
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        debug!(exit_code = ?status.code(), "Child process exited");

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
