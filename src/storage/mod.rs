//! Storage module for posts served by the API
//!
//! Crawled records are tagged with a document id and a search key before
//! they are inserted into a [`PostStore`]. The bundled backend keeps the
//! whole collection in one JSON array file.

mod file_store;
mod traits;

pub use file_store::FileStore;
pub use traits::{PostStore, StorageError, StorageResult};

use crate::post::PostRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A post record as kept in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPost {
    /// Random document id
    #[serde(rename = "_id")]
    pub id: String,

    /// Text the collection is searched by; the profile name
    #[serde(rename = "$vectorize")]
    pub vectorize: String,

    #[serde(flatten)]
    pub record: PostRecord,
}

impl StoredPost {
    /// Wraps a crawled record with a fresh id
    pub fn tag(record: PostRecord) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            vectorize: record.username.clone(),
            record,
        }
    }
}
