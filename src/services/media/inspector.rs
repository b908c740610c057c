//! Aspect-ratio classification via `ffprobe`.

use super::{ProcessingError, ToolRunner};
use serde::Deserialize;
use std::{ffi::OsString, fmt, path::Path, sync::Arc};

pub const FFPROBE: &str = "ffprobe";

/// Orientation bucket of a video, used as the object-store key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Portrait,
    Other,
}

impl AspectRatio {
    /// Exact 16:9 / 9:16 test using integer floor division. Anything that
    /// is off by rounding, or too large to scale, lands in `Other`.
    pub fn classify(width: u64, height: u64) -> Self {
        if is_sixteen_ninths(width, height) {
            Self::Landscape
        } else if is_sixteen_ninths(height, width) {
            Self::Portrait
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

/// `long == floor(16 * short / 9)`
fn is_sixteen_ninths(long: u64, short: u64) -> bool {
    short
        .checked_mul(16)
        .is_some_and(|scaled| long == scaled / 9)
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u64>,
    height: Option<u64>,
}

#[derive(Clone)]
pub struct MediaInspector {
    runner: Arc<dyn ToolRunner>,
}

impl MediaInspector {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    fn probe_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());
        args
    }

    /// Probe the first video stream of `path` and classify its geometry.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "probe"))]
    pub async fn video_aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProcessingError> {
        let output = self
            .runner
            .run(FFPROBE, &Self::probe_args(path))
            .await
            .map_err(|source| ProcessingError::Spawn {
                tool: FFPROBE,
                source,
            })?;

        if !output.success() {
            return Err(ProcessingError::failed(FFPROBE, &output));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        let stream = probe.streams.first().ok_or(ProcessingError::NoStreams)?;
        let (Some(width), Some(height)) = (stream.width, stream.height) else {
            return Err(ProcessingError::MissingDimensions);
        };

        let ratio = AspectRatio::classify(width, height);
        tracing::info!(width, height, aspect_ratio = %ratio, "video probe completed");
        Ok(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media::runner::ToolOutput;
    use async_trait::async_trait;
    use std::{io, sync::Mutex};

    #[test]
    fn classification_uses_exact_floor_division() {
        assert_eq!(AspectRatio::classify(1920, 1080), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(1080, 1920), AspectRatio::Portrait);
        assert_eq!(AspectRatio::classify(1000, 999), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(1280, 720), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(720, 1280), AspectRatio::Portrait);
        // 16 * 1081 / 9 = 1921 (floor), so 1920x1081 is not landscape.
        assert_eq!(AspectRatio::classify(1920, 1081), AspectRatio::Other);
        // 16 * 100 / 9 = 177 (floor)
        assert_eq!(AspectRatio::classify(177, 100), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(178, 100), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(100, 177), AspectRatio::Portrait);
        assert_eq!(AspectRatio::classify(640, 640), AspectRatio::Other);
    }

    #[test]
    fn oversized_dimensions_are_other() {
        assert_eq!(AspectRatio::classify(1, u64::MAX / 8), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(u64::MAX / 8, 1), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(u64::MAX, u64::MAX), AspectRatio::Other);
    }

    #[test]
    fn labels() {
        assert_eq!(AspectRatio::Landscape.to_string(), "landscape");
        assert_eq!(AspectRatio::Portrait.as_str(), "portrait");
        assert_eq!(AspectRatio::Other.as_str(), "other");
    }

    struct ScriptedProbe {
        output: ToolOutput,
        calls: Mutex<Vec<Vec<OsString>>>,
    }

    impl ScriptedProbe {
        fn new(status: i32, stdout: &str, stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                output: ToolOutput {
                    status: Some(status),
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: stderr.as_bytes().to_vec(),
                },
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ToolRunner for ScriptedProbe {
        async fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
            assert_eq!(program, FFPROBE);
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn parses_probe_json() {
        let runner = ScriptedProbe::new(
            0,
            r#"{"programs": [], "streams": [{"width": 1080, "height": 1920}]}"#,
            "",
        );
        let inspector = MediaInspector::new(runner.clone());
        let ratio = inspector
            .video_aspect_ratio(Path::new("/tmp/in.mp4"))
            .await
            .unwrap();
        assert_eq!(ratio, AspectRatio::Portrait);

        let calls = runner.calls.lock().unwrap();
        let args: Vec<_> = calls[0].iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
                "/tmp/in.mp4"
            ]
        );
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let runner = ScriptedProbe::new(1, "", "moov atom not found");
        let err = MediaInspector::new(runner)
            .video_aspect_ratio(Path::new("/tmp/in.mp4"))
            .await
            .unwrap_err();
        match err {
            ProcessingError::ToolFailed { tool, stderr, .. } => {
                assert_eq!(tool, FFPROBE);
                assert_eq!(stderr, "moov atom not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_streams_is_an_error() {
        let runner = ScriptedProbe::new(0, r#"{"streams": []}"#, "");
        let err = MediaInspector::new(runner)
            .video_aspect_ratio(Path::new("/tmp/in.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::NoStreams));
    }

    #[tokio::test]
    async fn garbage_output_is_a_parse_error() {
        let runner = ScriptedProbe::new(0, "not json", "");
        let err = MediaInspector::new(runner)
            .video_aspect_ratio(Path::new("/tmp/in.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Parse(_)));
    }
}
