use crate::{
    services::{auth::AuthError, metadata_store::StoreError, upload_service::PipelineError},
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Message shown to callers for any 5xx outside development mode.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong on our end";

/// Error surfaced by every handler.
///
/// Client errors carry a message that is returned verbatim. `Internal`
/// carries diagnostic detail that is logged and only exposed to callers by
/// [`expose_error_detail`] when running on the dev platform.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

/// Diagnostic text of a 5xx, attached to the response extensions.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let body = Json(json!({
        "error": message,
        "status": status.as_u16()
    }));

    (status, body).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Internal(detail) => {
                tracing::error!(status = status.as_u16(), error = %detail, "request failed");
                let mut response = error_body(status, GENERIC_ERROR_MESSAGE);
                response.extensions_mut().insert(ErrorDetail(detail));
                response
            }
            other => error_body(status, &other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VideoNotFound(_) => ApiError::not_found("Couldn't find video"),
            StoreError::EmailTaken(_) => ApiError::bad_request("User already exists"),
            StoreError::Sqlx(e) => ApiError::internal(format!("database error: {e}")),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingBearer
            | AuthError::MalformedBearer
            | AuthError::InvalidToken
            | AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::Hash(_) | AuthError::Sign(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Invalid(msg) => ApiError::BadRequest(msg),
            PipelineError::NotFound(msg) => ApiError::NotFound(msg),
            PipelineError::Forbidden(msg) => ApiError::Forbidden(msg),
            PipelineError::Store(e) => e.into(),
            other => ApiError::internal(other.to_string()),
        }
    }
}

/// Response middleware: on the dev platform, replace the generic 5xx body
/// with the diagnostic detail recorded by `ApiError::into_response`.
pub async fn expose_error_detail(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if !state.config.is_dev() {
        return response;
    }
    error_body(response.status(), &detail)
}
