//! Single-writer ingest sink
//!
//! Chunk fetchers enqueue records through cloned [`SinkHandle`]s without
//! blocking. One dedicated writer thread drains the queue, batches records
//! and appends each batch to the output file. A stop sentinel ends the
//! writer after it has flushed whatever is still buffered.
//!
//! The sentinel is enqueued by [`IngestSink::finish`], or by `Drop` when the
//! sink goes away on any other path, so buffered records are never
//! abandoned. Callers must only stop the sink once every producer is done.

use crate::output::json_file::JsonArrayFile;
use crate::output::SinkError;
use crate::post::PostRecord;
use std::path::PathBuf;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Messages consumed by the writer
#[derive(Debug)]
pub enum SinkMessage {
    Record(Box<PostRecord>),
    Stop,
}

/// What the writer accomplished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Records persisted to the output file
    pub records_written: usize,

    /// Batches written
    pub flushes: usize,

    /// Records in batches whose write failed
    pub records_lost: usize,

    /// Times unreadable prior content was discarded
    pub recovered_corruptions: usize,
}

/// Producer side of the sink
#[derive(Debug, Clone)]
pub struct SinkHandle {
    tx: UnboundedSender<SinkMessage>,
}

impl SinkHandle {
    /// Enqueues a record without waiting for it to be written
    pub fn enqueue(&self, record: PostRecord) -> Result<(), SinkError> {
        self.tx
            .send(SinkMessage::Record(Box::new(record)))
            .map_err(|_| SinkError::Closed)
    }
}

/// The sink and its writer thread
pub struct IngestSink {
    handle: SinkHandle,
    writer: Option<JoinHandle<SinkReport>>,
    stopped: bool,
}

impl IngestSink {
    /// Starts the writer thread for `path`
    ///
    /// # Arguments
    ///
    /// * `path` - JSON array file to append to
    /// * `batch_size` - Records buffered before each flush (at least 1)
    pub fn spawn(path: impl Into<PathBuf>, batch_size: usize) -> Result<Self, SinkError> {
        let file = JsonArrayFile::new(path);
        let (tx, rx) = unbounded_channel();
        let batch_size = batch_size.max(1);

        let writer = std::thread::Builder::new()
            .name("ingest-sink".to_string())
            .spawn(move || run_writer(rx, file, batch_size))?;

        Ok(Self {
            handle: SinkHandle { tx },
            writer: Some(writer),
            stopped: false,
        })
    }

    /// Returns a producer handle
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Enqueues the sentinel and waits for the writer to drain
    pub async fn finish(mut self) -> Result<SinkReport, SinkError> {
        self.send_stop();

        let writer = self.writer.take().ok_or(SinkError::WriterPanicked)?;
        tokio::task::spawn_blocking(move || writer.join())
            .await
            .map_err(|_| SinkError::WriterPanicked)?
            .map_err(|_| SinkError::WriterPanicked)
    }

    fn send_stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            // The writer only exits on the sentinel, so a failed send means it is already gone
            let _ = self.handle.tx.send(SinkMessage::Stop);
        }
    }
}

impl Drop for IngestSink {
    fn drop(&mut self) {
        if !self.stopped {
            tracing::warn!("Ingest sink dropped without finish; flushing buffered records");
            self.send_stop();
        }
    }
}

fn run_writer(
    mut rx: UnboundedReceiver<SinkMessage>,
    file: JsonArrayFile,
    batch_size: usize,
) -> SinkReport {
    let mut report = SinkReport::default();
    let mut batch: Vec<PostRecord> = Vec::with_capacity(batch_size);

    tracing::debug!("Ingest sink writing to {}", file.path().display());

    // A closed channel (every sender dropped) is treated like the sentinel
    while let Some(message) = rx.blocking_recv() {
        match message {
            SinkMessage::Record(record) => {
                batch.push(*record);
                if batch.len() >= batch_size {
                    flush(&file, &mut batch, &mut report);
                }
            }
            SinkMessage::Stop => break,
        }
    }

    if !batch.is_empty() {
        flush(&file, &mut batch, &mut report);
    }

    tracing::info!(
        "Ingest sink stopped: {} records in {} flushes to {}",
        report.records_written,
        report.flushes,
        file.path().display()
    );
    report
}

fn flush(file: &JsonArrayFile, batch: &mut Vec<PostRecord>, report: &mut SinkReport) {
    match file.append(batch) {
        Ok(outcome) => {
            report.records_written += batch.len();
            report.flushes += 1;
            if outcome.recovered_corruption {
                report.recovered_corruptions += 1;
            }
            tracing::debug!(
                "Flushed {} records ({} in file)",
                batch.len(),
                outcome.total
            );
        }
        Err(e) => {
            report.records_lost += batch.len();
            tracing::error!("Error writing batch to {}: {}", file.path().display(), e);
        }
    }
    batch.clear();
}
