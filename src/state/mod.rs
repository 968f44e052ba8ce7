//! State module for tracking chunk fetch progress
//!
//! # Components
//!
//! - `ChunkState`: the fetcher state machine (running, rate limited, errored, done, exhausted)
//! - `ChunkProgress`: cursor, emission count and retry attempts of one chunk

mod chunk_state;
mod progress;

// Re-export main types
pub use chunk_state::ChunkState;
pub use progress::ChunkProgress;
