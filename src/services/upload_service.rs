//! src/services/upload_service.rs
//!
//! UploadService — thumbnail and video upload pipelines.
//!
//! Each pipeline checks the declared media type, resolves the video, and
//! verifies ownership before any byte reaches the disk (the size cap is
//! enforced earlier, while the multipart field is read). The video pipeline
//! then runs write → inspect → remux → upload → persist; both scratch
//! files sit in `TempPath` guards, so they are removed on every exit path,
//! and the record is only written once the whole sequence succeeded.

use crate::{
    models::video::Video,
    services::{
        auth::random_token,
        media::{MediaInspector, MediaRemuxer, ProcessingError},
        metadata_store::{MetadataStore, StoreError},
        object_uploader::{ObjectUploader, UploadError},
    },
};
use bytes::Bytes;
use std::{io, path::PathBuf, sync::Arc};
use tempfile::TempPath;
use thiserror::Error;
use uuid::Uuid;

/// Hard cap on thumbnail uploads (10 MiB).
pub const MAX_THUMBNAIL_SIZE: usize = 10 << 20;

/// Hard cap on video uploads (1 GiB).
pub const MAX_VIDEO_SIZE: usize = 1 << 30;

/// Declared media types accepted for thumbnails.
pub const THUMBNAIL_MEDIA_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// The only declared media type accepted for videos.
pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A multipart file field read into memory, already under its size cap.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// `Content-Type` declared by the client for this field. Not sniffed.
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Where processed artifacts end up and how their URLs are formed.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub assets_root: PathBuf,
    /// Public base URL of `assets_root`, without trailing slash.
    pub assets_base_url: String,
    pub s3_bucket: String,
    pub s3_region: String,
}

impl UploadSettings {
    pub fn s3_object_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.s3_bucket, self.s3_region, key
        )
    }
}

#[derive(Clone)]
pub struct UploadService {
    store: MetadataStore,
    inspector: MediaInspector,
    remuxer: MediaRemuxer,
    uploader: Arc<dyn ObjectUploader>,
    settings: Arc<UploadSettings>,
}

impl UploadService {
    pub fn new(
        store: MetadataStore,
        inspector: MediaInspector,
        remuxer: MediaRemuxer,
        uploader: Arc<dyn ObjectUploader>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            store,
            inspector,
            remuxer,
            uploader,
            settings: Arc::new(settings),
        }
    }

    /// Resolve `video_id` and make sure `user_id` owns it.
    async fn owned_video(&self, user_id: Uuid, video_id: Uuid, action: &str) -> PipelineResult<Video> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound("Couldn't find video".into()))?;

        if video.user_id != user_id {
            tracing::warn!(%video_id, %user_id, owner = %video.user_id, "rejected {action} by non-owner");
            return Err(PipelineError::Forbidden(format!(
                "You do not have permission to {action} this video"
            )));
        }
        Ok(video)
    }

    /// Store a thumbnail under `assets_root` and point the video at it.
    ///
    /// The declared content type is trusted as-is; the bytes are not
    /// inspected to confirm they are an image.
    #[tracing::instrument(skip(self, file), fields(size_bytes = file.data.len()))]
    pub async fn upload_thumbnail(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        file: UploadedFile,
    ) -> PipelineResult<Video> {
        let media_type = file
            .content_type
            .as_deref()
            .filter(|t| THUMBNAIL_MEDIA_TYPES.contains(t))
            .ok_or_else(|| PipelineError::Invalid("Invalid thumbnail file type".into()))?;

        let mut video = self.owned_video(user_id, video_id, "upload a thumbnail for").await?;

        let file_name = format!("{}.{}", random_token(), extension_for(media_type));
        let path = self.settings.assets_root.join(&file_name);
        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|source| PipelineError::Write {
                path: path.display().to_string(),
                source,
            })?;

        video.thumbnail_url = Some(format!("{}/{}", self.settings.assets_base_url, file_name));
        let video = self.store.update_video(&video).await?;
        tracing::info!(thumbnail = %file_name, "thumbnail stored");
        Ok(video)
    }

    /// Process an uploaded MP4 and publish it to object storage.
    #[tracing::instrument(skip(self, file), fields(size_bytes = file.data.len()))]
    pub async fn upload_video(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        file: UploadedFile,
    ) -> PipelineResult<Video> {
        if file.content_type.as_deref() != Some(VIDEO_MEDIA_TYPE) {
            return Err(PipelineError::Invalid("Invalid video file type".into()));
        }

        let mut video = self.owned_video(user_id, video_id, "upload").await?;

        let file_name = format!("{}.{}", video_id, extension_for(VIDEO_MEDIA_TYPE));
        let raw_path = self.settings.assets_root.join(&file_name);
        let raw = TempPath::from_path(&raw_path);
        tokio::fs::write(&raw, &file.data)
            .await
            .map_err(|source| PipelineError::Write {
                path: raw_path.display().to_string(),
                source,
            })?;

        let aspect = self.inspector.video_aspect_ratio(&raw).await?;

        // Guarded before ffmpeg runs: a failed remux can leave a partial file.
        let processed = TempPath::from_path(MediaRemuxer::output_path(&raw));
        self.remuxer.process_for_fast_start(&raw).await?;

        let key = format!("{aspect}/{file_name}");
        self.uploader
            .put_file(&processed, &key, VIDEO_MEDIA_TYPE)
            .await?;

        for scratch in [processed, raw] {
            if let Err(err) = scratch.close() {
                tracing::warn!(error = %err, "failed to remove scratch file");
            }
        }

        video.video_url = Some(self.settings.s3_object_url(&key));
        let video = self.store.update_video(&video).await?;
        tracing::info!(%key, "video published");
        Ok(video)
    }
}

/// `image/png` → `png`; anything without a single `/` → `bin`.
fn extension_for(media_type: &str) -> &str {
    match media_type.split_once('/') {
        Some((_, sub)) if !sub.is_empty() && !sub.contains('/') => sub,
        _ => "bin",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::{
        media::{ToolOutput, ToolRunner},
        metadata_store::tests::memory_store,
    };
    use crate::models::video::NewVideo;
    use async_trait::async_trait;
    use std::{
        ffi::OsString,
        path::Path,
        sync::Mutex,
    };

    /// Stands in for ffprobe/ffmpeg. ffmpeg "succeeds" by copying its input
    /// to the output path, the last argument.
    pub(crate) struct FakeTools {
        pub width: u64,
        pub height: u64,
        pub probe_status: i32,
        pub remux_status: i32,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeTools {
        pub(crate) fn new(width: u64, height: u64) -> Arc<Self> {
            Arc::new(Self {
                width,
                height,
                probe_status: 0,
                remux_status: 0,
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing_remux() -> Arc<Self> {
            Arc::new(Self {
                width: 1920,
                height: 1080,
                probe_status: 0,
                remux_status: 1,
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing_probe() -> Arc<Self> {
            Arc::new(Self {
                width: 1920,
                height: 1080,
                probe_status: 1,
                remux_status: 0,
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolRunner for FakeTools {
        async fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
            self.calls.lock().unwrap().push(program.to_string());
            match program {
                "ffprobe" => Ok(ToolOutput {
                    status: Some(self.probe_status),
                    stdout: format!(
                        r#"{{"streams":[{{"width":{},"height":{}}}]}}"#,
                        self.width, self.height
                    )
                    .into_bytes(),
                    stderr: Vec::new(),
                }),
                "ffmpeg" => {
                    if self.remux_status == 0 {
                        let input = Path::new(&args[1]);
                        let output = Path::new(&args[args.len() - 1]);
                        tokio::fs::copy(input, output).await?;
                    }
                    Ok(ToolOutput {
                        status: Some(self.remux_status),
                        stdout: Vec::new(),
                        stderr: b"remux failed".to_vec(),
                    })
                }
                other => Err(io::Error::new(io::ErrorKind::NotFound, other.to_string())),
            }
        }
    }

    /// Records what would have been uploaded.
    #[derive(Default)]
    pub(crate) struct FakeUploader {
        pub fail: bool,
        pub uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl FakeUploader {
        pub(crate) fn uploads(&self) -> Vec<(String, String, Vec<u8>)> {
            self.uploads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectUploader for FakeUploader {
        async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> Result<(), UploadError> {
            if self.fail {
                return Err(UploadError::Put {
                    key: key.to_string(),
                    reason: "bucket unreachable".into(),
                });
            }
            let data = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
                path: path.display().to_string(),
                source,
            })?;
            self.uploads
                .lock()
                .unwrap()
                .push((key.to_string(), content_type.to_string(), data));
            Ok(())
        }
    }

    pub(crate) fn test_settings(assets_root: &Path) -> UploadSettings {
        UploadSettings {
            assets_root: assets_root.to_path_buf(),
            assets_base_url: "http://localhost:8091/assets".into(),
            s3_bucket: "tubely-media".into(),
            s3_region: "us-east-2".into(),
        }
    }

    struct Fixture {
        service: UploadService,
        store: MetadataStore,
        tools: Arc<FakeTools>,
        uploader: Arc<FakeUploader>,
        assets: tempfile::TempDir,
        owner: Uuid,
        stranger: Uuid,
        video: Video,
    }

    async fn fixture(tools: Arc<FakeTools>, uploader: FakeUploader) -> Fixture {
        let store = memory_store().await;
        let owner = store.create_user("owner@example.com", "hash").await.unwrap().id;
        let stranger = store.create_user("stranger@example.com", "hash").await.unwrap().id;
        let video = store
            .create_video(
                owner,
                NewVideo {
                    title: "clip".into(),
                    description: "a clip".into(),
                },
            )
            .await
            .unwrap();

        let assets = tempfile::tempdir().unwrap();
        let uploader = Arc::new(uploader);
        let service = UploadService::new(
            store.clone(),
            MediaInspector::new(tools.clone()),
            MediaRemuxer::new(tools.clone()),
            uploader.clone(),
            test_settings(assets.path()),
        );

        Fixture {
            service,
            store,
            tools,
            uploader,
            assets,
            owner,
            stranger,
            video,
        }
    }

    fn mp4() -> UploadedFile {
        UploadedFile {
            content_type: Some(VIDEO_MEDIA_TYPE.into()),
            data: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42 fake movie"),
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn extension_from_media_type() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpeg");
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("garbage"), "bin");
    }

    #[tokio::test]
    async fn video_upload_publishes_and_cleans_up() {
        let fx = fixture(FakeTools::new(1080, 1920), FakeUploader::default()).await;

        let updated = fx
            .service
            .upload_video(fx.owner, fx.video.id, mp4())
            .await
            .unwrap();

        let expected_key = format!("portrait/{}.mp4", fx.video.id);
        assert_eq!(
            updated.video_url.as_deref(),
            Some(
                format!("https://tubely-media.s3.us-east-2.amazonaws.com/{expected_key}").as_str()
            )
        );
        assert_eq!(fx.tools.calls(), ["ffprobe", "ffmpeg"]);

        let uploads = fx.uploader.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, expected_key);
        assert_eq!(uploads[0].1, "video/mp4");
        assert_eq!(uploads[0].2, mp4().data.to_vec());

        let stored = fx.store.get_video(fx.video.id).await.unwrap().unwrap();
        assert_eq!(stored.video_url, updated.video_url);
        assert!(dir_is_empty(fx.assets.path()));
    }

    #[tokio::test]
    async fn wrong_media_type_is_rejected_before_any_tool_runs() {
        let fx = fixture(FakeTools::new(1920, 1080), FakeUploader::default()).await;
        let file = UploadedFile {
            content_type: Some("video/quicktime".into()),
            data: Bytes::from_static(b"mov"),
        };

        let err = fx
            .service
            .upload_video(fx.owner, fx.video.id, file)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Invalid(_)));
        assert!(fx.tools.calls().is_empty());
        assert!(dir_is_empty(fx.assets.path()));
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_and_record_untouched() {
        let fx = fixture(FakeTools::new(1920, 1080), FakeUploader::default()).await;

        let err = fx
            .service
            .upload_video(fx.stranger, fx.video.id, mp4())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden(_)));
        assert!(fx.tools.calls().is_empty());
        assert!(dir_is_empty(fx.assets.path()));

        let stored = fx.store.get_video(fx.video.id).await.unwrap().unwrap();
        assert_eq!(stored, fx.video);
    }

    #[tokio::test]
    async fn unknown_video_is_not_found() {
        let fx = fixture(FakeTools::new(1920, 1080), FakeUploader::default()).await;
        let err = fx
            .service
            .upload_video(fx.owner, Uuid::new_v4(), mp4())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn probe_failure_stops_before_remux() {
        let fx = fixture(FakeTools::failing_probe(), FakeUploader::default()).await;
        let before = fx.store.get_video(fx.video.id).await.unwrap().unwrap();

        let err = fx
            .service
            .upload_video(fx.owner, fx.video.id, mp4())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Processing(_)));
        assert_eq!(fx.tools.calls(), ["ffprobe"]);
        assert!(fx.uploader.uploads().is_empty());
        assert!(dir_is_empty(fx.assets.path()));

        let after = fx.store.get_video(fx.video.id).await.unwrap().unwrap();
        assert_eq!(after, before);
        assert!(after.video_url.is_none());
    }

    #[tokio::test]
    async fn remux_failure_leaves_record_and_disk_clean() {
        let fx = fixture(FakeTools::failing_remux(), FakeUploader::default()).await;

        let err = fx
            .service
            .upload_video(fx.owner, fx.video.id, mp4())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Processing(_)));
        assert!(fx.uploader.uploads().is_empty());
        assert!(dir_is_empty(fx.assets.path()));

        let stored = fx.store.get_video(fx.video.id).await.unwrap().unwrap();
        assert!(stored.video_url.is_none());
        assert_eq!(stored, fx.video);
    }

    #[tokio::test]
    async fn upload_failure_leaves_record_and_disk_clean() {
        let uploader = FakeUploader {
            fail: true,
            ..Default::default()
        };
        let fx = fixture(FakeTools::new(1000, 999), uploader).await;

        let err = fx
            .service
            .upload_video(fx.owner, fx.video.id, mp4())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Upload(_)));
        assert_eq!(fx.tools.calls(), ["ffprobe", "ffmpeg"]);
        assert!(dir_is_empty(fx.assets.path()));

        let stored = fx.store.get_video(fx.video.id).await.unwrap().unwrap();
        assert!(stored.video_url.is_none());
    }

    #[tokio::test]
    async fn thumbnail_is_written_and_linked() {
        let fx = fixture(FakeTools::new(1920, 1080), FakeUploader::default()).await;
        let file = UploadedFile {
            content_type: Some("image/png".into()),
            data: Bytes::from_static(b"\x89PNG fake"),
        };

        let updated = fx
            .service
            .upload_thumbnail(fx.owner, fx.video.id, file)
            .await
            .unwrap();

        let url = updated.thumbnail_url.unwrap();
        let name = url
            .strip_prefix("http://localhost:8091/assets/")
            .expect("thumbnail served from assets");
        assert!(name.ends_with(".png"));
        let on_disk = std::fs::read(fx.assets.path().join(name)).unwrap();
        assert_eq!(on_disk, b"\x89PNG fake");
        assert!(fx.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn thumbnail_type_outside_allow_list_is_rejected() {
        let fx = fixture(FakeTools::new(1920, 1080), FakeUploader::default()).await;
        for content_type in [Some("image/gif"), Some("text/plain"), None] {
            let file = UploadedFile {
                content_type: content_type.map(str::to_string),
                data: Bytes::from_static(b"GIF89a"),
            };
            let err = fx
                .service
                .upload_thumbnail(fx.owner, fx.video.id, file)
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::Invalid(_)));
        }
        assert!(dir_is_empty(fx.assets.path()));
    }

    #[tokio::test]
    async fn thumbnail_by_non_owner_is_forbidden() {
        let fx = fixture(FakeTools::new(1920, 1080), FakeUploader::default()).await;
        let file = UploadedFile {
            content_type: Some("image/jpeg".into()),
            data: Bytes::from_static(b"jpeg"),
        };
        let err = fx
            .service
            .upload_thumbnail(fx.stranger, fx.video.id, file)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden(_)));
        assert!(dir_is_empty(fx.assets.path()));
    }
}
