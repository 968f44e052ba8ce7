//! Canonical post records
//!
//! Every post pulled from a data source is normalized into a [`PostRecord`]
//! before it reaches the ingest sink. The record shape is the stable output
//! format of a crawl: field names here are the field names on disk.

mod normalize;
mod record;

pub use normalize::{clean_caption, extract_hashtags, format_timestamp, normalize_post};
pub use record::{Metrics, PostKind, PostRecord, TIMESTAMP_FORMAT};
