//! Login, token refresh/revoke, and the `AuthUser` extractor.

use crate::{
    errors::ApiError,
    models::user::User,
    services::auth::{
        ACCESS_TOKEN_TTL_HOURS, REFRESH_TOKEN_TTL_DAYS, check_password, get_bearer_token,
        make_jwt, make_refresh_token, validate_jwt,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, request::Parts},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity taken from a valid `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = get_bearer_token(&parts.headers)?;
        let user_id = validate_jwt(token, &state.config.jwt_secret)?;
        Ok(AuthUser(user_id))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let user = state
        .store
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Incorrect email or password"))?;
    check_password(&req.password, &user.password)?;

    let token = make_jwt(
        user.id,
        &state.config.jwt_secret,
        Duration::hours(ACCESS_TOKEN_TTL_HOURS),
    )?;
    let refresh_token = make_refresh_token();
    state
        .store
        .create_refresh_token(
            &refresh_token,
            user.id,
            Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS),
        )
        .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        user,
        token,
        refresh_token,
    }))
}

/// `POST /api/refresh` — exchange a refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refresh_token = get_bearer_token(&headers)?;
    let user_id = state
        .store
        .get_user_by_refresh_token(refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    let token = make_jwt(
        user_id,
        &state.config.jwt_secret,
        Duration::hours(ACCESS_TOKEN_TTL_HOURS),
    )?;
    Ok(Json(RefreshResponse { token }))
}

/// `POST /api/revoke`
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let refresh_token = get_bearer_token(&headers)?;
    if !state.store.revoke_refresh_token(refresh_token).await? {
        return Err(ApiError::unauthorized("Invalid refresh token"));
    }
    Ok(StatusCode::NO_CONTENT)
}
