//! Pushes processed artifacts to S3 bucket storage.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload,
    aws::{AmazonS3, AmazonS3Builder},
    path::Path as ObjectPath,
};
use std::{io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("object store misconfigured: {0}")]
    Config(String),
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("upload of `{key}` failed: {reason}")]
    Put { key: String, reason: String },
}

/// Single-attempt upload of a local file under `key`.
///
/// There is no retry, no multipart session and no read-back; the caller
/// derives the public URL from bucket, region and key.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> Result<(), UploadError>;
}

/// Uploader backed by an `AmazonS3` object store.
///
/// Credentials come from the standard `AWS_*` environment variables.
#[derive(Clone, Debug)]
pub struct S3Uploader {
    store: AmazonS3,
    bucket: String,
}

impl S3Uploader {
    pub fn new(bucket: &str, region: &str) -> Result<Self, UploadError> {
        let store = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| UploadError::Config(e.to_string()))?;

        Ok(Self {
            store,
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> Result<(), UploadError> {
        let data = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let size = data.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let start = std::time::Instant::now();
        self.store
            .put_opts(
                &ObjectPath::from(key),
                PutPayload::from(Bytes::from(data)),
                PutOptions::from(attributes),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_millis(),
                    "S3 upload failed"
                );
                UploadError::Put {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "S3 upload successful"
        );
        Ok(())
    }
}
