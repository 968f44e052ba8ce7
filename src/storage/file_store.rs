//! JSON collection file backend
//!
//! Unlike the crawl output, a store file that cannot be parsed is an error:
//! it holds previously served data and is never reset.

use crate::storage::traits::{PostStore, StorageError, StorageResult};
use crate::storage::StoredPost;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Post store backed by one JSON array file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<Vec<StoredPost>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StorageError::CorruptCollection(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn save(&self, posts: &[StoredPost]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, serde_json::to_string_pretty(posts)?).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for FileStore {
    async fn find(&self, username: &str, limit: usize) -> StorageResult<Vec<StoredPost>> {
        let _guard = self.lock.lock().await;

        let mut found: Vec<StoredPost> = self
            .load()
            .await?
            .into_iter()
            .filter(|post| post.record.username == username)
            .collect();

        // Timestamps are zero-padded, so string order is time order
        found.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        found.truncate(limit);
        Ok(found)
    }

    async fn insert_many(&self, posts: Vec<StoredPost>) -> StorageResult<()> {
        if posts.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;

        let mut collection = self.load().await?;
        let inserted = posts.len();
        collection.extend(posts);
        self.save(&collection).await?;

        tracing::debug!(
            "Inserted {} posts into {} ({} total)",
            inserted,
            self.path.display(),
            collection.len()
        );
        Ok(())
    }
}
