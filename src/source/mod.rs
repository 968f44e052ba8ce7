//! Data source boundary
//!
//! A data source yields the posts of a profile newest-first through a lazy
//! [`PostListing`]. Listings are opened with a [`Credential`]; a source that
//! throttles per credential answers with [`SourceError::RateLimited`] and the
//! crawler fails over to another session.
//!
//! Two implementations ship with the crate:
//! - [`HttpSource`]: paginated JSON listing service reached over reqwest
//! - [`MemorySource`]: in-memory fixture data with scriptable failures

mod http;
mod memory;

pub use http::HttpSource;
pub use memory::{MemorySource, ScriptedFailure};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a data source
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Throttled; `retry_after` is the wait the source suggested, if any
    #[error("Too many requests (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Profile '{0}' does not exist")]
    ProfileNotFound(String),

    /// Network, protocol or decode failure worth retrying
    #[error("Transient source error: {0}")]
    Transient(String),
}

impl SourceError {
    /// Returns true if the failure should be retried with another credential
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ProfileNotFound(_))
    }
}

/// Result type for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// A crawl session handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    /// Session token; requests are anonymous without one
    pub token: Option<String>,
}

impl Credential {
    pub fn new(name: impl Into<String>, token: Option<String>) -> Self {
        Self {
            name: name.into(),
            token,
        }
    }

    pub fn anonymous(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A post as delivered by the source, before normalization
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPost {
    pub id: String,

    /// Source media type marker ("GraphImage", "GraphVideo", "GraphSidecar")
    #[serde(default)]
    pub typename: String,

    #[serde(default)]
    pub is_video: bool,

    #[serde(default)]
    pub display_url: String,

    /// Media of each carousel item
    #[serde(default)]
    pub sidecar_urls: Vec<String>,

    #[serde(default)]
    pub likes: u64,

    #[serde(default)]
    pub comments: u64,

    #[serde(default)]
    pub video_view_count: Option<u64>,

    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub location_name: Option<String>,

    pub taken_at: DateTime<Utc>,
}

impl RawPost {
    /// Returns true if the source marks this post as a multi-item carousel
    pub fn is_carousel(&self) -> bool {
        self.typename == "GraphSidecar"
    }
}

/// A lazily consumed, newest-first sequence of posts
#[async_trait]
pub trait PostListing: Send {
    /// Returns the next post, or `None` once the profile has no older posts
    async fn next_post(&mut self) -> SourceResult<Option<RawPost>>;
}

/// A provider of post listings
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Opens a fresh listing positioned at the newest post of `profile`
    async fn open_listing(
        &self,
        profile: &str,
        credential: &Credential,
    ) -> SourceResult<Box<dyn PostListing>>;
}
