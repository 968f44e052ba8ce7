//! Crawler module for profile post harvesting
//!
//! This module contains the core crawling logic, including:
//! - Credential pairs that fail over on throttling
//! - Splitting a profile's requested range into chunks
//! - The per-chunk retry and rotation state machine
//! - Run-wide deduplication and self-imposed delays
//! - Overall crawl coordination

mod coordinator;
mod credentials;
mod dedup;
mod fetcher;
mod planner;
mod throttle;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use credentials::{CredentialPair, CredentialPool, CredentialSlot};
pub use dedup::SeenSet;
pub use fetcher::{ChunkFetcher, ChunkOutcome};
pub use planner::{plan, Chunk};
pub use throttle::Throttle;
