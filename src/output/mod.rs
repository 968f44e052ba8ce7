//! Output module for crawl results
//!
//! This module handles:
//! - The single-writer ingest sink that crawl workers stream records into
//! - Whole-file JSON array persistence with corruption recovery
//! - Statistics over an existing output file

mod json_file;
mod sink;
pub mod stats;

pub use json_file::{read_records, AppendOutcome, JsonArrayFile};
pub use sink::{IngestSink, SinkHandle, SinkMessage, SinkReport};
pub use stats::{load_statistics, print_statistics, OutputStatistics};

use thiserror::Error;

/// Errors that can occur while persisting crawl output
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Ingest sink is closed")]
    Closed,

    #[error("Ingest sink writer panicked")]
    WriterPanicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
