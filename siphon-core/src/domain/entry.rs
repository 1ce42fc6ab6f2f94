//! Crash entry domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};

/// One record handed out by a crash-entry store
///
/// The entry owns its payload stream. Whatever the stream holds open (a file
/// descriptor, a mapped region) is released when the entry is closed or
/// dropped, whichever happens first. Entries are never written back.
pub struct CrashEntry {
    tag: String,
    timestamp_millis: i64,
    payload: Box<dyn Read + Send>,
}

impl CrashEntry {
    /// Creates an entry that reads its payload from `payload`
    pub fn new(
        tag: impl Into<String>,
        timestamp_millis: i64,
        payload: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            tag: tag.into(),
            timestamp_millis,
            payload,
        }
    }

    /// Creates an entry whose payload was dropped by the store
    pub fn lost(tag: impl Into<String>, timestamp_millis: i64) -> Self {
        Self::new(tag, timestamp_millis, Box::new(io::empty()))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Producer time of the entry, also used as the pagination cursor
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    /// Reads the remaining payload bytes
    pub fn read_payload(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.payload.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Releases the payload stream
    pub fn close(self) {
        drop(self);
    }
}

impl fmt::Debug for CrashEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashEntry")
            .field("tag", &self.tag)
            .field("timestamp_millis", &self.timestamp_millis)
            .finish_non_exhaustive()
    }
}

/// Entry metadata without the payload, used for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub tag: String,
    pub timestamp_millis: i64,
    pub size_bytes: u64,
    /// The store kept the record but dropped its contents
    pub lost: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_payload() {
        let mut entry = CrashEntry::new("crash", 42, Box::new(Cursor::new(b"boom".to_vec())));
        assert_eq!(entry.tag(), "crash");
        assert_eq!(entry.timestamp_millis(), 42);
        assert_eq!(entry.read_payload().unwrap(), b"boom");
        // Stream is consumed
        assert!(entry.read_payload().unwrap().is_empty());
    }

    #[test]
    fn test_lost_entry_is_empty() {
        let mut entry = CrashEntry::lost("crash", 7);
        assert!(entry.read_payload().unwrap().is_empty());
    }

    #[test]
    fn test_debug_omits_payload() {
        let entry = CrashEntry::lost("anr", 1);
        let debug = format!("{:?}", entry);
        assert!(debug.contains("anr"));
        assert!(!debug.contains("payload"));
    }
}
