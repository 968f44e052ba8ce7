//! Conversion of raw source posts into canonical records

use crate::post::record::{Metrics, PostKind, PostRecord, TIMESTAMP_FORMAT};
use crate::source::RawPost;
use chrono::{DateTime, Utc};

/// Normalizes a raw source post into a [`PostRecord`] owned by `username`
pub fn normalize_post(username: &str, post: &RawPost) -> PostRecord {
    let kind = if post.is_carousel() {
        PostKind::Carousel
    } else if post.is_video {
        PostKind::Video
    } else {
        PostKind::Image
    };

    let media_urls = match kind {
        PostKind::Carousel if !post.sidecar_urls.is_empty() => post.sidecar_urls.clone(),
        _ => vec![post.display_url.clone()],
    };

    let views = if kind == PostKind::Video {
        post.video_view_count.unwrap_or(0)
    } else {
        0
    };

    let caption_raw = post.caption.clone().unwrap_or_default();

    PostRecord {
        post_id: post.id.clone(),
        username: username.to_string(),
        kind,
        media_urls,
        caption_clean: clean_caption(&caption_raw),
        hashtags: extract_hashtags(&caption_raw),
        caption_raw,
        metrics: Metrics {
            likes: post.likes,
            comments: post.comments,
            views,
        },
        location: post
            .location_name
            .as_ref()
            .filter(|name| !name.is_empty())
            .cloned(),
        timestamp: format_timestamp(&post.taken_at),
    }
}

/// Strips everything except ASCII letters, digits and whitespace
pub fn clean_caption(caption: &str) -> String {
    caption
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Extracts lowercase hashtags from whitespace-separated caption words
///
/// Only words starting with `#` count. Non-alphanumeric characters are
/// dropped from each tag; tags left empty are skipped and each tag is kept
/// once, in order of first appearance.
pub fn extract_hashtags(caption: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for word in caption.split_whitespace() {
        if !word.starts_with('#') {
            continue;
        }

        let tag: String = word
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    tags
}

/// Formats a creation time the way records store it
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
