pub mod admin_handlers;
pub mod auth_handlers;
pub mod health_handlers;
pub mod upload_handlers;
pub mod user_handlers;
pub mod video_handlers;


use crate::errors::ApiError;
use uuid::Uuid;

/// Parse the `{video_id}` path segment.
pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid video ID"))
}
