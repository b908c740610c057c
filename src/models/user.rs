//! Represents an account and its refresh tokens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A registered user. The password hash never leaves the server.
#[derive(Serialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub email: String,

    /// Argon2id hash in PHC string format.
    #[serde(skip_serializing)]
    pub password: String,
}

/// Long-lived token exchanged for fresh access tokens.
#[derive(Clone, FromRow, Debug)]
pub struct RefreshToken {
    pub token: String,

    pub user_id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Set once the token has been revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}
