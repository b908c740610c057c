//! Fast-start remuxing via `ffmpeg`.

use super::{ProcessingError, ToolRunner};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

pub const FFMPEG: &str = "ffmpeg";

/// Appended to the input path to name the remuxed copy.
pub const PROCESSED_SUFFIX: &str = ".processed";

#[derive(Clone)]
pub struct MediaRemuxer {
    runner: Arc<dyn ToolRunner>,
}

impl MediaRemuxer {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// `<input>.processed`
    pub fn output_path(input: &Path) -> PathBuf {
        let mut name = input.as_os_str().to_owned();
        name.push(PROCESSED_SUFFIX);
        PathBuf::from(name)
    }

    fn remux_args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args = vec![OsString::from("-i"), input.as_os_str().to_owned()];
        args.extend(
            [
                "-movflags",
                "faststart",
                "-map_metadata",
                "0",
                "-codec",
                "copy",
                "-f",
                "mp4",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Copy the streams of `input` into a new MP4 with the index moved to
    /// the front. Returns the path of the new file; `input` is left alone.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "faststart"))]
    pub async fn process_for_fast_start(&self, input: &Path) -> Result<PathBuf, ProcessingError> {
        let output_path = Self::output_path(input);
        let output = self
            .runner
            .run(FFMPEG, &Self::remux_args(input, &output_path))
            .await
            .map_err(|source| ProcessingError::Spawn {
                tool: FFMPEG,
                source,
            })?;

        if !output.success() {
            return Err(ProcessingError::failed(FFMPEG, &output));
        }

        tracing::info!(output = %output_path.display(), "fast-start remux completed");
        Ok(output_path)
    }
}
