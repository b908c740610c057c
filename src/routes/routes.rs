//! Defines the HTTP surface of the service.
//!
//! ## Structure
//! - **Auth**
//!   - `POST /api/users`   — sign up
//!   - `POST /api/login`   — access + refresh token
//!   - `POST /api/refresh` — new access token from a refresh token
//!   - `POST /api/revoke`  — revoke a refresh token
//!
//! - **Videos**
//!   - `GET|POST    /api/videos`
//!   - `GET|DELETE  /api/videos/{video_id}`
//!   - `POST /api/thumbnail_upload/{video_id}` — multipart `thumbnail`
//!   - `GET  /api/thumbnails/{video_id}`
//!   - `POST /api/video_upload/{video_id}`     — multipart `video`
//!
//! - **Static**
//!   - `/assets/*` — files under `assets_root`, never cached
//!   - everything else falls through to the web app in `filepath_root`

use crate::{
    errors::expose_error_detail,
    handlers::{
        admin_handlers::reset,
        auth_handlers::{login, refresh, revoke},
        health_handlers::{healthz, readyz},
        upload_handlers::{get_thumbnail, upload_thumbnail, upload_video},
        user_handlers::create_user,
        video_handlers::{create_video, delete_video, get_video, list_videos},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, set_header::SetResponseHeader, trace::TraceLayer};

/// Build the router with all routes, middleware and state applied.
///
/// Upload routes lift axum's default body limit; their size caps are
/// enforced per field while the multipart body is read.
pub fn routes(state: AppState) -> Router {
    let assets = SetResponseHeader::overriding(
        ServeDir::new(&state.config.assets_root),
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // auth
        .route("/api/users", post(create_user))
        .route("/api/login", post(login))
        .route("/api/refresh", post(refresh))
        .route("/api/revoke", post(revoke))
        // videos
        .route("/api/videos", get(list_videos).post(create_video))
        .route("/api/videos/{video_id}", get(get_video).delete(delete_video))
        .route("/api/thumbnails/{video_id}", get(get_thumbnail))
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::disable()),
        )
        .route("/admin/reset", post(reset))
        // static files
        .nest_service("/assets", assets)
        .fallback_service(ServeDir::new(&state.config.filepath_root))
        .layer(middleware::map_response_with_state(
            state.clone(),
            expose_error_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
