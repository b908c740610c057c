//! Core data models for the video hosting service.
//!
//! These entities map to SQLite tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod user;
pub mod video;
