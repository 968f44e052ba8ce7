//! Chunk fetcher
//!
//! Fills one [`Chunk`] with deduplicated records while tolerating throttling:
//!
//! 1. Open a listing with the pair's active credential
//! 2. Skip to `start_index + cursor` (skipped posts are not dedup-checked)
//! 3. Emit posts until the chunk holds `end_index - start_index` records or
//!    the listing ends; posts already seen by this chunk or anywhere else in
//!    the run are dropped without moving the cursor
//! 4. On a rate limit or transient error, sleep if throttled, rotate the
//!    credential and go back to 1 with cursor and dedup sets intact
//! 5. After `max_attempts` failed attempts stop with what was fetched
//!
//! An unknown profile is not retried; it is returned to the caller.

use crate::crawler::credentials::CredentialPair;
use crate::crawler::dedup::SeenSet;
use crate::crawler::planner::Chunk;
use crate::crawler::throttle::Throttle;
use crate::output::SinkHandle;
use crate::post::normalize_post;
use crate::source::{PostSource, SourceError, SourceResult};
use crate::state::{ChunkProgress, ChunkState};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a finished chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub chunk: Chunk,

    /// Records emitted to the sink
    pub fetched: usize,

    /// Either [`ChunkState::Done`] or [`ChunkState::Exhausted`]
    pub state: ChunkState,

    /// Failed attempts along the way
    pub attempts: u32,
}

/// How a single listing attempt ended without a source error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptEnd {
    /// The cursor reached the end of the chunk
    Covered,
    /// The profile ran out of posts first
    ListingEnded,
    /// The sink stopped accepting records
    SinkClosed,
}

/// Retry/rotate state machine for one chunk
pub struct ChunkFetcher {
    chunk: Chunk,
    credentials: CredentialPair,
    source: Arc<dyn PostSource>,
    sink: SinkHandle,
    global_seen: SeenSet,
    local_seen: HashSet<String>,
    throttle: Throttle,
    max_attempts: u32,
    progress: ChunkProgress,
}

impl ChunkFetcher {
    /// Creates a fetcher for `chunk`
    ///
    /// # Arguments
    ///
    /// * `chunk` - Range of the profile's listing to cover
    /// * `credentials` - Failover pair owned by this fetcher
    /// * `source` - Data source to open listings on
    /// * `sink` - Destination of emitted records
    /// * `global_seen` - Ids emitted anywhere in the current run
    /// * `throttle` - Delay policy
    /// * `max_attempts` - Failed attempts allowed before giving up
    pub fn new(
        chunk: Chunk,
        credentials: CredentialPair,
        source: Arc<dyn PostSource>,
        sink: SinkHandle,
        global_seen: SeenSet,
        throttle: Throttle,
        max_attempts: u32,
    ) -> Self {
        Self {
            chunk,
            credentials,
            source,
            sink,
            global_seen,
            local_seen: HashSet::new(),
            throttle,
            max_attempts: max_attempts.max(1),
            progress: ChunkProgress::new(),
        }
    }

    /// Runs the chunk to completion
    ///
    /// # Returns
    ///
    /// * `Ok(ChunkOutcome)` - The chunk finished or ran out of attempts; the
    ///   fetched count may be below the chunk size in both cases
    /// * `Err(SourceError::ProfileNotFound)` - The profile does not exist
    pub async fn run(mut self) -> SourceResult<ChunkOutcome> {
        loop {
            match self.attempt().await {
                Ok(end) => {
                    if end == AttemptEnd::SinkClosed {
                        tracing::error!("Sink closed while fetching chunk {}", self.chunk);
                    }
                    self.progress.finish();
                    break;
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    let rate_limited = matches!(e, SourceError::RateLimited { .. });
                    if rate_limited {
                        tracing::warn!(
                            "Rate limit reached for chunk {} on {} session {}",
                            self.chunk,
                            self.credentials.active_slot(),
                            self.credentials.current()
                        );
                    } else {
                        tracing::warn!("Error fetching chunk {}: {}", self.chunk, e);
                    }

                    if !self.progress.record_failure(rate_limited, self.max_attempts) {
                        tracing::error!(
                            "All sessions exhausted for chunk {} after {} attempts",
                            self.chunk,
                            self.progress.attempts
                        );
                        break;
                    }

                    if let SourceError::RateLimited { retry_after } = e {
                        self.throttle.after_rate_limit(retry_after).await;
                    }

                    self.credentials.rotate();
                    tracing::info!(
                        "Switching to {} session {} and continuing chunk {} from post {}",
                        self.credentials.active_slot(),
                        self.credentials.current(),
                        self.chunk,
                        self.chunk.start_index + self.progress.cursor
                    );
                    self.progress.resume();
                }
            }
        }

        debug_assert!(self.progress.state.is_terminal());
        tracing::debug!(
            "Chunk {} {} with {} posts",
            self.chunk,
            self.progress.state,
            self.progress.emitted
        );

        Ok(ChunkOutcome {
            fetched: self.progress.emitted,
            state: self.progress.state,
            attempts: self.progress.attempts,
            chunk: self.chunk,
        })
    }

    /// One pass over a freshly opened listing
    async fn attempt(&mut self) -> SourceResult<AttemptEnd> {
        let mut listing = self
            .source
            .open_listing(&self.chunk.profile, self.credentials.current())
            .await?;

        // The listing always starts at the newest post
        let resume_at = self.chunk.start_index + self.progress.cursor;
        let mut position = 0;
        while position < resume_at {
            if listing.next_post().await?.is_none() {
                return Ok(AttemptEnd::ListingEnded);
            }
            position += 1;
        }

        while self.chunk.start_index + self.progress.cursor < self.chunk.end_index {
            let Some(post) = listing.next_post().await? else {
                return Ok(AttemptEnd::ListingEnded);
            };

            // Claiming the id in the shared set decides which chunk emits it
            if self.local_seen.contains(&post.id) || !self.global_seen.insert(&post.id) {
                tracing::trace!("Skipping duplicate post {}", post.id);
                continue;
            }
            self.local_seen.insert(post.id.clone());

            let record = normalize_post(&self.chunk.profile, &post);
            if self.sink.enqueue(record).is_err() {
                return Ok(AttemptEnd::SinkClosed);
            }
            self.progress.advance();

            self.throttle.after_emit().await;
        }

        Ok(AttemptEnd::Covered)
    }
}
