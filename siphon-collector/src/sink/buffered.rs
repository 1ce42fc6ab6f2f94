//! Buffered log sink
//!
//! Connects the collection job to a [`LogBufferService`], so forwarded
//! entries can be drained and rendered by whoever owns the buffer (the CLI
//! prints them after a run).

use siphon_core::domain::log::{LogLevel, LogRecord};
use std::sync::Arc;

use super::LogSink;
use crate::service::LogBufferService;

/// Buffered log sink that writes to a LogBufferService
pub struct BufferedLogSink {
    buffer: Arc<dyn LogBufferService>,
}

impl BufferedLogSink {
    /// Creates a new buffered log sink
    ///
    /// # Arguments
    /// * `buffer` - The log buffer service to write to
    pub fn new(buffer: Arc<dyn LogBufferService>) -> Self {
        Self { buffer }
    }
}

impl LogSink for BufferedLogSink {
    fn emit(&self, tag: &str, text: &str) {
        let record = LogRecord {
            timestamp: chrono::Utc::now(),
            level: LogLevel::Debug,
            tag: tag.to_string(),
            message: text.to_string(),
        };

        self.buffer.add_record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryLogBuffer;

    #[test]
    fn test_emit_buffers_records_in_order() {
        let buffer = InMemoryLogBuffer::new();
        let sink = BufferedLogSink::new(Arc::new(buffer.clone()));

        sink.emit("crash", "first");
        sink.emit("crash", "second");

        let records = buffer.drain();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, "crash");
        assert_eq!(records[0].message, "first");
        assert_eq!(records[0].level, LogLevel::Debug);
        assert_eq!(records[1].message, "second");

        // Buffer should be empty after drain
        assert!(buffer.drain().is_empty());
    }
}
