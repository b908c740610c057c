//! src/services/metadata_store.rs
//!
//! MetadataStore — durable records for users, refresh tokens and videos,
//! backed by SQLite. Updates are plain full-row writes keyed by id, so two
//! concurrent writers to the same video resolve as last-writer-wins.

use crate::models::{
    user::{RefreshToken, User},
    video::{NewVideo, Video},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Schema applied at start-up and by `--migrate`.
const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video `{0}` not found")]
    VideoNotFound(Uuid),
    #[error("user with email `{0}` already exists")]
    EmailTaken(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const VIDEO_COLUMNS: &str =
    "id, created_at, updated_at, title, description, thumbnail_url, video_url, user_id";

#[derive(Clone)]
pub struct MetadataStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl MetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema. Every statement is idempotent.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        let statements = INIT_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            tracing::debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    // --- users ---

    pub async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            password: password_hash.to_string(),
        };

        match sqlx::query(
            "INSERT INTO users (id, created_at, updated_at, email, password)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(&user.email)
        .bind(&user.password)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(StoreError::EmailTaken(email.to_string())),
            Err(err) => Err(StoreError::Sqlx(err)),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, email, password FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    // --- refresh tokens ---

    pub async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshToken> {
        let now = Utc::now();
        let record = RefreshToken {
            token: token.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };

        sqlx::query(
            "INSERT INTO refresh_tokens (token, created_at, updated_at, user_id, expires_at, revoked_at)
             VALUES (?, ?, ?, ?, ?, NULL)",
        )
        .bind(&record.token)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.user_id)
        .bind(record.expires_at)
        .execute(&*self.db)
        .await?;

        Ok(record)
    }

    /// Owner of a refresh token that is neither revoked nor expired.
    pub async fn get_user_by_refresh_token(&self, token: &str) -> StoreResult<Option<Uuid>> {
        let record = sqlx::query_as::<_, RefreshToken>(
            "SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&*self.db)
        .await?;

        Ok(record
            .filter(|r| r.revoked_at.is_none() && r.expires_at > Utc::now())
            .map(|r| r.user_id))
    }

    /// Returns false when the token does not exist.
    pub async fn revoke_refresh_token(&self, token: &str) -> StoreResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?, updated_at = ? WHERE token = ?",
        )
        .bind(now)
        .bind(now)
        .bind(token)
        .execute(&*self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- videos ---

    pub async fn create_video(&self, user_id: Uuid, new: NewVideo) -> StoreResult<Video> {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: new.title,
            description: new.description,
            thumbnail_url: None,
            video_url: None,
            user_id,
        };

        sqlx::query(
            "INSERT INTO videos (id, created_at, updated_at, title, description, thumbnail_url, video_url, user_id)
             VALUES (?, ?, ?, ?, ?, NULL, NULL, ?)",
        )
        .bind(video.id)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.user_id)
        .execute(&*self.db)
        .await?;

        Ok(video)
    }

    pub async fn get_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(video)
    }

    /// Videos owned by `user_id`, newest first.
    pub async fn get_videos(&self, user_id: Uuid) -> StoreResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(videos)
    }

    /// Persist the mutable fields of `video` and return the stored row.
    pub async fn update_video(&self, video: &Video) -> StoreResult<Video> {
        sqlx::query_as::<_, Video>(&format!(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(Utc::now())
        .bind(video.id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::VideoNotFound(video.id))
    }

    pub async fn delete_video(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VideoNotFound(id));
        }
        Ok(())
    }

    /// Wipe every table. Only reachable on the dev platform.
    pub async fn reset(&self) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        for table in ["refresh_tokens", "videos", "users"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
