use async_trait::async_trait;
use std::{ffi::OsString, io};
use tokio::process::Command;

/// Result of one external tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs an external program to completion and captures its output.
///
/// The only channel to the tool is its argument list, exit status and
/// standard streams.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput>;
}

/// Spawns real processes found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct SystemToolRunner;

#[async_trait]
impl ToolRunner for SystemToolRunner {
    #[tracing::instrument(skip(self, args), fields(process.executable.name = %program))]
    async fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
        let start = std::time::Instant::now();
        let output = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await?;

        tracing::debug!(
            status = ?output.status.code(),
            duration_ms = start.elapsed().as_millis(),
            "tool finished"
        );

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
