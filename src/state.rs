use crate::{
    config::AppConfig,
    services::{
        media::{MediaInspector, MediaRemuxer, ToolRunner},
        metadata_store::MetadataStore,
        object_uploader::ObjectUploader,
        upload_service::{UploadService, UploadSettings},
    },
};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: MetadataStore,
    pub uploads: UploadService,
}

impl AppState {
    /// Wire the services together. The tool runner and uploader are
    /// injected so tests can replace ffprobe/ffmpeg and S3.
    pub fn new(
        config: AppConfig,
        store: MetadataStore,
        tools: Arc<dyn ToolRunner>,
        uploader: Arc<dyn ObjectUploader>,
    ) -> Self {
        let settings = UploadSettings {
            assets_root: config.assets_root.clone(),
            assets_base_url: config.assets_base_url(),
            s3_bucket: config.s3_bucket.clone(),
            s3_region: config.s3_region.clone(),
        };
        let uploads = UploadService::new(
            store.clone(),
            MediaInspector::new(tools.clone()),
            MediaRemuxer::new(tools),
            uploader,
            settings,
        );

        Self {
            config: Arc::new(config),
            store,
            uploads,
        }
    }
}
