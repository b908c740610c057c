//! HTTP handlers for video metadata.

use crate::{
    errors::ApiError,
    handlers::{auth_handlers::AuthUser, parse_video_id},
    models::video::{NewVideo, Video},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// `POST /api/videos`
pub async fn create_video(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CreateVideoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Video>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::bad_request("Missing title or description"));
    }

    let video = state
        .store
        .create_video(
            user_id,
            NewVideo {
                title: req.title,
                description: req.description,
            },
        )
        .await?;

    tracing::info!(video_id = %video.id, %user_id, "video created");
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos` — the caller's videos.
pub async fn list_videos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.store.get_videos(user_id).await?))
}

/// `GET /api/videos/{video_id}`
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state
        .store
        .get_video(video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Couldn't find video"))?;
    Ok(Json(video))
}

/// `DELETE /api/videos/{video_id}` — owner only.
pub async fn delete_video(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state
        .store
        .get_video(video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Couldn't find video"))?;
    if video.user_id != user_id {
        return Err(ApiError::forbidden("Not authorized to delete this video"));
    }

    state.store.delete_video(video_id).await?;
    tracing::info!(%video_id, %user_id, "video deleted");
    Ok(StatusCode::NO_CONTENT)
}
