use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of [`PostRecord::timestamp`]
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Media type of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostKind {
    Image,
    Video,
    /// Multi-item post; one media URL per sub-item
    Carousel,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Carousel => "Carousel",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub likes: u64,
    pub comments: u64,
    /// Always 0 for non-video posts
    pub views: u64,
}

/// A normalized post, the unit of crawl output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Source-assigned identifier, unique within one crawl run's output
    pub post_id: String,
    pub username: String,
    pub kind: PostKind,
    pub media_urls: Vec<String>,
    pub caption_raw: String,
    /// Caption reduced to ASCII letters, digits and whitespace
    pub caption_clean: String,
    pub hashtags: Vec<String>,
    pub metrics: Metrics,
    pub location: Option<String>,
    /// UTC creation time in [`TIMESTAMP_FORMAT`]
    pub timestamp: String,
}
