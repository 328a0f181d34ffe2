//! Newline-delimited JSON sink.
//!
//! Many concurrent visits append to one stream. Each record is serialized
//! into a complete line (compact JSON plus `\n`) before the writer lock is
//! taken, and the line is written with one `write_all` while holding it, so
//! lines never interleave.
//!
//! Closing consumes the sink; nothing can be appended afterwards.

use crate::error::SinkError;
use crate::models::PageRecord;
use std::error::Error;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Serialize a record as one NDJSON line, terminator included.
pub fn to_line(record: &PageRecord) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

#[derive(Debug)]
pub struct NdjsonSink<W> {
    writer: Mutex<W>,
}

impl NdjsonSink<BufWriter<File>> {
    /// Create (or truncate) the output file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn create(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::create(path).await?;
        info!("Created output file");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W> NdjsonSink<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Append one record as a single contiguous line.
    pub async fn append(&self, record: &PageRecord) -> Result<(), SinkError> {
        let line = to_line(record)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        Ok(())
    }

    /// Flush buffered lines, shut the stream down and hand back the writer.
    pub async fn close(self) -> std::io::Result<W> {
        let mut writer = self.writer.into_inner();
        writer.flush().await?;
        writer.shutdown().await?;
        Ok(writer)
    }
}
