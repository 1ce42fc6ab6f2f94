//! Log buffer service
//!
//! Manages in-memory collection of forwarded crash entries.
//! This service provides thread-safe access to a record buffer that the
//! collection job writes to and its owner drains afterwards.

use siphon_core::domain::log::LogRecord;
use std::sync::{Arc, Mutex, PoisonError};

/// Service for managing log buffers
///
/// This service wraps a thread-safe buffer for collecting log records
/// during a collection run. It provides methods to add records and drain
/// the buffer.
pub trait LogBufferService: Send + Sync {
    /// Adds a record to the buffer
    ///
    /// # Arguments
    /// * `record` - The log record to add
    fn add_record(&self, record: LogRecord);

    /// Drains all records from the buffer
    ///
    /// This returns all buffered records and clears the buffer.
    fn drain(&self) -> Vec<LogRecord>;

    /// Number of buffered records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory implementation of LogBufferService
///
/// Uses Arc<Mutex<Vec<LogRecord>>> so clones share one buffer.
#[derive(Clone)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<Vec<LogRecord>>>,
}

impl InMemoryLogBuffer {
    /// Creates a new in-memory log buffer
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for InMemoryLogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBufferService for InMemoryLogBuffer {
    fn add_record(&self, record: LogRecord) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push(record);
    }

    fn drain(&self) -> Vec<LogRecord> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.drain(..).collect()
    }

    fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siphon_core::domain::log::LogLevel;

    fn record(message: &str) -> LogRecord {
        LogRecord {
            timestamp: chrono::Utc::now(),
            level: LogLevel::Info,
            tag: "crash".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_clones_share_buffer() {
        let buffer = InMemoryLogBuffer::new();
        let clone = buffer.clone();

        clone.add_record(record("one"));
        clone.add_record(record("two"));

        assert_eq!(buffer.len(), 2);
        let drained = buffer.drain();
        assert_eq!(drained[0].message, "one");
        assert!(clone.is_empty());
    }
}
