//! External media tooling: `ffprobe` for inspection, `ffmpeg` for remuxing.
//!
//! Both tools are reached through [`ToolRunner`] so tests can swap in a
//! scripted fake. No timeout is applied: a hung tool blocks only the request
//! that spawned it.

pub mod inspector;
pub mod remuxer;
pub mod runner;

use thiserror::Error;

pub use inspector::{AspectRatio, MediaInspector};
pub use remuxer::MediaRemuxer;
pub use runner::{SystemToolRunner, ToolOutput, ToolRunner};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },
    #[error("could not parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no video streams found")]
    NoStreams,
    #[error("video stream has no dimensions")]
    MissingDimensions,
}

impl ProcessingError {
    /// Error for a tool that ran to completion with a non-zero status.
    pub(crate) fn failed(tool: &'static str, output: &ToolOutput) -> Self {
        Self::ToolFailed {
            tool,
            status: output
                .status
                .map(|code| format!("status {code}"))
                .unwrap_or_else(|| "signal".to_string()),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}
