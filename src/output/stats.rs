//! Statistics over a crawl output file
//!
//! This module summarizes what an output file holds: how many records, for
//! which profiles, of which media kinds, and whether any post id repeats.

use crate::output::{read_records, SinkError};
use crate::post::{PostKind, PostRecord};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Number of hashtags listed by [`print_statistics`]
const TOP_HASHTAGS: usize = 10;

/// Output file summary
#[derive(Debug, Clone, Default)]
pub struct OutputStatistics {
    /// Total records in the file
    pub total_records: u64,

    /// Distinct post ids
    pub unique_posts: u64,

    /// Records per profile
    pub records_by_profile: HashMap<String, u64>,

    /// Records per media kind
    pub records_by_kind: HashMap<PostKind, u64>,

    /// Hashtag frequencies
    pub hashtags: HashMap<String, u64>,

    /// Summed likes, comments and views
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_views: u64,
}

impl OutputStatistics {
    /// Builds statistics from records
    pub fn from_records(records: &[PostRecord]) -> Self {
        let mut stats = Self::default();
        let mut seen = HashSet::new();

        for record in records {
            stats.total_records += 1;
            if seen.insert(record.post_id.as_str()) {
                stats.unique_posts += 1;
            }

            *stats
                .records_by_profile
                .entry(record.username.clone())
                .or_insert(0) += 1;
            *stats.records_by_kind.entry(record.kind).or_insert(0) += 1;
            for tag in &record.hashtags {
                *stats.hashtags.entry(tag.clone()).or_insert(0) += 1;
            }

            stats.total_likes += record.metrics.likes;
            stats.total_comments += record.metrics.comments;
            stats.total_views += record.metrics.views;
        }

        stats
    }

    /// Records sharing a post id with an earlier record
    pub fn duplicate_records(&self) -> u64 {
        self.total_records - self.unique_posts
    }

    /// Most frequent hashtags, ties broken alphabetically
    pub fn top_hashtags(&self, limit: usize) -> Vec<(String, u64)> {
        let mut tags: Vec<(String, u64)> = self
            .hashtags
            .iter()
            .map(|(tag, count)| (tag.clone(), *count))
            .collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags.truncate(limit);
        tags
    }
}

/// Loads statistics from an output file
pub fn load_statistics(path: &Path) -> Result<OutputStatistics, SinkError> {
    let records = read_records(path)?;
    Ok(OutputStatistics::from_records(&records))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &OutputStatistics) {
    println!("=== Output Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Unique posts: {}", stats.unique_posts);
    if stats.duplicate_records() > 0 {
        println!("  Duplicate records: {}", stats.duplicate_records());
    }
    println!();

    println!("Records by Profile:");
    let mut profiles: Vec<_> = stats.records_by_profile.iter().collect();
    profiles.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (profile, count) in profiles {
        println!("  {}: {}", profile, count);
    }
    println!();

    println!("Records by Kind:");
    for kind in [PostKind::Image, PostKind::Video, PostKind::Carousel] {
        let count = stats.records_by_kind.get(&kind).copied().unwrap_or(0);
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
    println!();

    println!("Engagement:");
    println!("  Likes: {}", stats.total_likes);
    println!("  Comments: {}", stats.total_comments);
    println!("  Views: {}", stats.total_views);

    let top = stats.top_hashtags(TOP_HASHTAGS);
    if !top.is_empty() {
        println!("\nTop Hashtags:");
        for (tag, count) in top {
            println!("  #{}: {}", tag, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::Metrics;

    fn record(id: &str, user: &str, kind: PostKind, tags: &[&str]) -> PostRecord {
        PostRecord {
            post_id: id.to_string(),
            username: user.to_string(),
            kind,
            media_urls: vec![],
            caption_raw: String::new(),
            caption_clean: String::new(),
            hashtags: tags.iter().map(|t| t.to_string()).collect(),
            metrics: Metrics {
                likes: 10,
                comments: 1,
                views: if kind == PostKind::Video { 100 } else { 0 },
            },
            location: None,
            timestamp: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_statistics_from_records() {
        let records = vec![
            record("a", "nasa", PostKind::Image, &["space", "mars"]),
            record("b", "nasa", PostKind::Video, &["space"]),
            record("c", "natgeo", PostKind::Carousel, &[]),
            record("a", "nasa", PostKind::Image, &["space"]),
        ];

        let stats = OutputStatistics::from_records(&records);
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.unique_posts, 3);
        assert_eq!(stats.duplicate_records(), 1);
        assert_eq!(stats.records_by_profile["nasa"], 3);
        assert_eq!(stats.records_by_kind[&PostKind::Carousel], 1);
        assert_eq!(stats.total_likes, 40);
        assert_eq!(stats.total_views, 100);
    }

    #[test]
    fn test_top_hashtags_ordering() {
        let records = vec![
            record("a", "x", PostKind::Image, &["b", "a"]),
            record("b", "x", PostKind::Image, &["b", "c"]),
        ];

        let stats = OutputStatistics::from_records(&records);
        let top = stats.top_hashtags(2);
        assert_eq!(top, vec![("b".to_string(), 2), ("a".to_string(), 1)]);
    }

    #[test]
    fn test_load_statistics_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let stats = load_statistics(&dir.path().join("none.json")).unwrap();
        assert_eq!(stats.total_records, 0);
    }
}
