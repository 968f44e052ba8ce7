/// Chunk state definitions for tracking fetch progress
///
/// This module defines all states a chunk fetcher moves through.
use std::fmt;

/// Represents the current state of a chunk fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkState {
    // ===== Active States =====
    /// Listing is open and posts are being consumed
    Running,

    /// The source throttled the active credential
    RateLimited,

    /// The source failed for another transient reason
    Errored,

    // ===== Terminal States =====
    /// The chunk range was covered or the listing ended first
    Done,

    /// The retry budget ran out; the posts fetched so far stand
    Exhausted,
}

impl ChunkState {
    /// Returns true if this is a terminal state (the fetcher has stopped)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Exhausted)
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// Running may fail or finish; a failed state either resumes after
    /// rotation or gives up. Terminal states never move again.
    pub fn can_transition_to(&self, next: ChunkState) -> bool {
        match self {
            Self::Running => matches!(
                next,
                Self::Running | Self::RateLimited | Self::Errored | Self::Done
            ),
            Self::RateLimited | Self::Errored => matches!(next, Self::Running | Self::Exhausted),
            Self::Done | Self::Exhausted => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::RateLimited => "rate_limited",
            Self::Errored => "errored",
            Self::Done => "done",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
