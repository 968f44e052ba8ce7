//! Chunk planning
//!
//! A profile's requested range `[0, total_posts)` is split into contiguous,
//! disjoint chunks of `ceil(total_posts / num_chunks)` posts; the last chunk
//! is truncated at `total_posts`.

use std::fmt;

/// A half-open range of a profile's newest-first post stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub profile: String,
    pub start_index: usize,
    pub end_index: usize,
}

impl Chunk {
    /// Number of listing positions covered
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{})", self.profile, self.start_index, self.end_index)
    }
}

/// Splits `[0, total_posts)` into at most `num_chunks` chunks
///
/// Empty ranges are never returned, so the plan holds fewer chunks when
/// the ceiling size covers the total early.
///
/// # Example
///
/// ```
/// use feed_harvest::crawler::plan;
///
/// let chunks = plan("x", 10, 3);
/// let ranges: Vec<_> = chunks.iter().map(|c| (c.start_index, c.end_index)).collect();
/// assert_eq!(ranges, vec![(0, 4), (4, 8), (8, 10)]);
/// ```
pub fn plan(profile: &str, total_posts: usize, num_chunks: usize) -> Vec<Chunk> {
    if total_posts == 0 || num_chunks == 0 {
        return Vec::new();
    }

    let chunk_size = total_posts.div_ceil(num_chunks);

    (0..num_chunks)
        .map(|i| (i * chunk_size, ((i + 1) * chunk_size).min(total_posts)))
        .take_while(|(start, _)| *start < total_posts)
        .map(|(start_index, end_index)| Chunk {
            profile: profile.to_string(),
            start_index,
            end_index,
        })
        .collect()
}
