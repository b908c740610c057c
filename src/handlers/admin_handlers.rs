use crate::{errors::ApiError, state::AppState};
use axum::extract::State;

/// `POST /admin/reset` — wipe all data. Dev platform only.
pub async fn reset(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    if !state.config.is_dev() {
        return Err(ApiError::forbidden("Reset is only allowed in dev environment."));
    }
    state.store.reset().await?;
    tracing::warn!("database reset");
    Ok("Database reset to initial state")
}
