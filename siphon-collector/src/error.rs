//! Error types for the collector

use siphon_core::domain::job::{ProcessStats, StopReason};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an entry store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened
    #[error("entry store unavailable at {}: {reason}", .path.display())]
    Unavailable {
        /// Location of the store
        path: PathBuf,
        /// Why it could not be opened
        reason: String,
    },

    /// I/O failure while querying the store
    #[error("entry store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store handed out an entry that is not older than the cursor
    #[error("entry at {timestamp} is not older than cursor {cursor}")]
    OutOfOrder {
        /// Cursor the query was made with
        cursor: i64,
        /// Timestamp of the returned entry
        timestamp: i64,
    },

    /// Tag cannot be used as part of an entry name
    #[error("invalid entry tag: {0:?}")]
    InvalidTag(String),

    /// No free timestamp is left at or above the requested one
    #[error("no free timestamp for tag {tag:?} at or after {requested}")]
    TimestampExhausted { tag: String, requested: i64 },
}

/// Why a single entry could not be forwarded
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("failed to read payload: {0}")]
    Read(#[from] std::io::Error),

    #[error("payload is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// Errors that end or taint a collection run
#[derive(Debug, Error)]
pub enum CollectError {
    /// The store could not be opened, nothing was drained
    #[error("entry store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Querying the store failed part way through the walk
    #[error("entry store read failed after {} entries: {source}", .stats.visited())]
    StoreReadError {
        #[source]
        source: StoreError,
        stats: ProcessStats,
    },

    /// The walk completed but some entries could not be forwarded
    #[error("{failed} of {} entries could not be read or decoded", .stats.visited())]
    PartialDecodeFailures {
        failed: u64,
        stats: ProcessStats,
        stop: StopReason,
    },

    /// The run was cancelled between entries
    #[error("collection cancelled after {} entries", .stats.visited())]
    Cancelled { stats: ProcessStats },
}

impl CollectError {
    /// Counters accumulated before the error
    pub fn stats(&self) -> ProcessStats {
        match self {
            CollectError::StoreUnavailable(_) => ProcessStats::default(),
            CollectError::StoreReadError { stats, .. }
            | CollectError::PartialDecodeFailures { stats, .. }
            | CollectError::Cancelled { stats } => *stats,
        }
    }

    pub fn stop_reason(&self) -> StopReason {
        match self {
            CollectError::StoreUnavailable(_) => StopReason::StoreUnavailable,
            CollectError::StoreReadError { .. } => StopReason::StoreReadError,
            CollectError::PartialDecodeFailures { stop, .. } => *stop,
            CollectError::Cancelled { .. } => StopReason::Cancelled,
        }
    }
}
