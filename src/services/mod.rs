pub mod auth;
pub mod media;
pub mod metadata_store;
pub mod object_uploader;
pub mod upload_service;
