//! Represents a video and its processing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for one uploaded (or yet to be uploaded) video.
///
/// `video_url` stays `None` until the upload pipeline has finished; readers
/// treat that as "processing not complete".
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: String,

    /// Inline `data:` URL or pointer to the stored thumbnail.
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: Option<String>,

    /// Public URL of the processed video in object storage.
    #[serde(rename = "videoURL")]
    pub video_url: Option<String>,

    /// Owner of the video.
    #[serde(rename = "userID")]
    pub user_id: Uuid,
}

/// Fields supplied by the caller when creating a video.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
}
