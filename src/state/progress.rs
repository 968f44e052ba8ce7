use crate::state::ChunkState;

/// Tracks how far a chunk fetcher has come
///
/// The record survives credential rotations: a retry re-opens the listing
/// and skips back to `start_index + cursor` instead of starting cold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Offset past the chunk start where a retry resumes; duplicates are not charged
    pub cursor: usize,

    /// Records handed to the sink
    pub emitted: usize,

    /// Failed listing attempts so far
    pub attempts: u32,

    /// Current state of the fetcher
    pub state: ChunkState,
}

impl ChunkProgress {
    /// Creates progress for a chunk that has not consumed anything yet
    pub fn new() -> Self {
        Self {
            cursor: 0,
            emitted: 0,
            attempts: 0,
            state: ChunkState::Running,
        }
    }

    fn transition(&mut self, next: ChunkState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal chunk transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Records one emitted post
    pub fn advance(&mut self) {
        self.cursor += 1;
        self.emitted += 1;
    }

    /// Records a failed attempt
    ///
    /// # Arguments
    ///
    /// * `rate_limited` - Whether the source throttled rather than erred
    /// * `max_attempts` - Retry budget of the chunk
    ///
    /// # Returns
    ///
    /// * `true` - Budget remains; rotate and call [`resume`](Self::resume)
    /// * `false` - The chunk is now [`ChunkState::Exhausted`]
    pub fn record_failure(&mut self, rate_limited: bool, max_attempts: u32) -> bool {
        self.transition(if rate_limited {
            ChunkState::RateLimited
        } else {
            ChunkState::Errored
        });
        self.attempts += 1;

        if self.attempts < max_attempts {
            true
        } else {
            self.transition(ChunkState::Exhausted);
            false
        }
    }

    /// Returns to running after a rotation
    pub fn resume(&mut self) {
        self.transition(ChunkState::Running);
    }

    /// Marks the chunk as completed
    pub fn finish(&mut self) {
        self.transition(ChunkState::Done);
    }
}

impl Default for ChunkProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_progress() {
        let progress = ChunkProgress::new();
        assert_eq!(progress.cursor, 0);
        assert_eq!(progress.emitted, 0);
        assert_eq!(progress.attempts, 0);
        assert_eq!(progress.state, ChunkState::Running);
    }

    #[test]
    fn test_advance_moves_cursor_with_emitted() {
        let mut progress = ChunkProgress::new();
        progress.advance();
        progress.advance();

        assert_eq!(progress.cursor, 2);
        assert_eq!(progress.emitted, 2);
    }

    #[test]
    fn test_failure_budget() {
        let mut progress = ChunkProgress::new();

        for _ in 0..3 {
            assert!(progress.record_failure(true, 4));
            assert_eq!(progress.state, ChunkState::RateLimited);
            progress.resume();
        }

        assert!(!progress.record_failure(false, 4));
        assert_eq!(progress.state, ChunkState::Exhausted);
        assert_eq!(progress.attempts, 4);
    }

    #[test]
    fn test_error_state() {
        let mut progress = ChunkProgress::new();
        assert!(progress.record_failure(false, 4));
        assert_eq!(progress.state, ChunkState::Errored);
    }

    #[test]
    fn test_finish() {
        let mut progress = ChunkProgress::new();
        progress.finish();
        assert!(progress.state.is_terminal());
    }
}
