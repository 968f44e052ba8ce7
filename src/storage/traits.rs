//! Storage traits and error types
//!
//! This module defines the trait interface for post store backends and
//! associated error types.

use crate::storage::StoredPost;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Collection file is not a JSON array: {0}")]
    CorruptCollection(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for post store implementations
///
/// Implementations must be safe to share between request handlers.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Returns up to `limit` stored posts of `username`, newest first
    async fn find(&self, username: &str, limit: usize) -> StorageResult<Vec<StoredPost>>;

    /// Appends posts to the collection
    async fn insert_many(&self, posts: Vec<StoredPost>) -> StorageResult<()>;
}
