//! JSON-lines log sink
//!
//! Appends one [`LogRecord`] per line to a local file. Each record is flushed
//! as soon as it is written.

use siphon_core::domain::log::{LogLevel, LogRecord};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use super::LogSink;

pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, record: &LogRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

impl LogSink for JsonLinesSink {
    fn emit(&self, tag: &str, text: &str) {
        let record = LogRecord {
            timestamp: chrono::Utc::now(),
            level: LogLevel::Debug,
            tag: tag.to_string(),
            message: text.to_string(),
        };

        if let Err(e) = self.write_record(&record) {
            warn!(
                "Failed to write crash entry to {}: {:#}",
                self.path.display(),
                e
            );
        }
    }
}
