//! Whole-file JSON array persistence
//!
//! The output file is a single JSON array. Each append reads the current
//! array, extends it in memory and rewrites the file through a temporary
//! sibling that is renamed over the original, so readers never observe a
//! half-written array.

use crate::output::SinkError;
use crate::post::PostRecord;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Result of a single append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Records in the file after the append
    pub total: usize,

    /// Prior content was not a JSON array and was discarded
    pub recovered_corruption: bool,
}

/// A JSON array file with exclusive append access
#[derive(Debug)]
pub struct JsonArrayFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonArrayFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `batch` to the array on disk
    ///
    /// Unreadable prior content is logged and replaced rather than failing the
    /// append.
    pub fn append(&self, batch: &[PostRecord]) -> Result<AppendOutcome, SinkError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let (mut existing, recovered_corruption) = self.read_existing()?;
        for record in batch {
            existing.push(serde_json::to_value(record)?);
        }

        self.write_atomic(&existing)?;

        Ok(AppendOutcome {
            total: existing.len(),
            recovered_corruption,
        })
    }

    fn read_existing(&self) -> Result<(Vec<Value>, bool), SinkError> {
        if !self.path.is_file() {
            return Ok((Vec::new(), false));
        }

        // Bytes, so invalid UTF-8 counts as a decode error too
        let content = fs::read(&self.path)?;
        if is_blank(&content) {
            return Ok((Vec::new(), false));
        }

        match serde_json::from_slice::<Vec<Value>>(&content) {
            Ok(values) => Ok((values, false)),
            Err(e) => {
                tracing::error!(
                    "JSON decode error in {}: {}. Resetting file.",
                    self.path.display(),
                    e
                );
                Ok((Vec::new(), true))
            }
        }
    }

    fn write_atomic(&self, values: &[Value]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let body = serde_json::to_string_pretty(values)?;
        fs::write(&tmp_path, body)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Reads every record from a crawl output file
///
/// A missing or empty file yields no records.
pub fn read_records(path: &Path) -> Result<Vec<PostRecord>, SinkError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let content = fs::read(path)?;
    if is_blank(&content) {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_slice(&content)?)
}

fn is_blank(content: &[u8]) -> bool {
    content.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{Metrics, PostKind};
    use tempfile::TempDir;

    fn record(id: &str) -> PostRecord {
        PostRecord {
            post_id: id.to_string(),
            username: "x".to_string(),
            kind: PostKind::Image,
            media_urls: vec![],
            caption_raw: String::new(),
            caption_clean: String::new(),
            hashtags: vec![],
            metrics: Metrics::default(),
            location: None,
            timestamp: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_append_creates_file_and_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        let file = JsonArrayFile::new(&path);

        let outcome = file.append(&[record("a"), record("b")]).unwrap();
        assert_eq!(outcome.total, 2);
        assert!(!outcome.recovered_corruption);

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].post_id, "b");
    }

    #[test]
    fn test_append_extends_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let file = JsonArrayFile::new(&path);

        file.append(&[record("a")]).unwrap();
        let outcome = file.append(&[record("b"), record("c")]).unwrap();

        assert_eq!(outcome.total, 3);
        assert!(!dir.path().join("out.json.tmp").exists());
    }

    #[test]
    fn test_append_recovers_from_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "{ not json at all").unwrap();

        let file = JsonArrayFile::new(&path);
        let outcome = file.append(&[record("fresh")]).unwrap();

        assert!(outcome.recovered_corruption);
        assert_eq!(outcome.total, 1);
        assert_eq!(read_records(&path).unwrap()[0].post_id, "fresh");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, [0xff, 0xfe, 0x5b, 0x80]).unwrap();

        let file = JsonArrayFile::new(&path);
        let outcome = file.append(&[record("a"), record("b")]).unwrap();

        assert!(outcome.recovered_corruption);
        assert_eq!(outcome.total, 2);
        assert_eq!(read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_records_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, [0xff, 0xfe, 0x5b, 0x80]).unwrap();

        assert!(matches!(read_records(&path), Err(SinkError::Json(_))));
    }

    #[test]
    fn test_read_records_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(read_records(&dir.path().join("nope.json")).unwrap().is_empty());
    }
}
