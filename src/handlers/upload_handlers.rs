//! Multipart upload endpoints and thumbnail retrieval.
//!
//! The size cap is enforced while the file field streams in, so an
//! oversized upload is rejected without ever being fully buffered.

use crate::{
    errors::ApiError,
    handlers::{auth_handlers::AuthUser, parse_video_id},
    models::video::Video,
    services::upload_service::{MAX_THUMBNAIL_SIZE, MAX_VIDEO_SIZE, UploadedFile},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use base64::{Engine as _, engine::general_purpose};
use bytes::BytesMut;

/// A file field expected in a multipart body.
struct FileField {
    name: &'static str,
    max_size: usize,
    too_large: &'static str,
}

const THUMBNAIL_FIELD: FileField = FileField {
    name: "thumbnail",
    max_size: MAX_THUMBNAIL_SIZE,
    too_large: "Thumbnail file is too large",
};

const VIDEO_FIELD: FileField = FileField {
    name: "video",
    max_size: MAX_VIDEO_SIZE,
    too_large: "Video file is too large",
};

/// Read the named field into memory, failing as soon as it exceeds its cap.
async fn read_file_field(mut multipart: Multipart, spec: &FileField) -> Result<UploadedFile, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(spec.name) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            if data.len() + chunk.len() > spec.max_size {
                return Err(ApiError::bad_request(spec.too_large));
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            content_type,
            data: data.freeze(),
        });
    }

    Err(ApiError::bad_request(format!("Invalid {} file", spec.name)))
}

/// `POST /api/thumbnail_upload/{video_id}` — multipart field `thumbnail`.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Video>, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    tracing::info!(%video_id, %user_id, "uploading thumbnail");

    let file = read_file_field(multipart, &THUMBNAIL_FIELD).await?;
    let video = state.uploads.upload_thumbnail(user_id, video_id, file).await?;
    Ok(Json(video))
}

/// `POST /api/video_upload/{video_id}` — multipart field `video`.
pub async fn upload_video(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Video>, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    tracing::info!(%video_id, %user_id, "uploading video");

    let file = read_file_field(multipart, &VIDEO_FIELD).await?;
    let video = state.uploads.upload_video(user_id, video_id, file).await?;
    Ok(Json(video))
}

/// `GET /api/thumbnails/{video_id}`
///
/// Inline `data:` thumbnails are decoded and served directly; pointer
/// thumbnails redirect to where the file lives.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Response, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state
        .store
        .get_video(video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Couldn't find video"))?;
    let thumbnail = video
        .thumbnail_url
        .ok_or_else(|| ApiError::not_found("Thumbnail not found"))?;

    let mut response = match thumbnail.strip_prefix("data:") {
        Some(inline) => {
            let (media_type, data) = decode_data_url(inline)
                .ok_or_else(|| ApiError::internal(format!("malformed data URL on video {video_id}")))?;
            let content_type = HeaderValue::from_str(&media_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], data).into_response()
        }
        None => Redirect::temporary(&thumbnail).into_response(),
    };
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

/// Split `<media type>;base64,<payload>` and decode the payload.
fn decode_data_url(inline: &str) -> Option<(String, Vec<u8>)> {
    let (meta, payload) = inline.split_once(',')?;
    let media_type = meta.strip_suffix(";base64")?;
    let data = general_purpose::STANDARD.decode(payload).ok()?;
    let media_type = if media_type.is_empty() {
        "application/octet-stream"
    } else {
        media_type
    };
    Some((media_type.to_string(), data))
}
