//! Drain checkpoint
//!
//! The checkpoint is the timestamp boundary of a backward walk through the
//! entry store. A walk starts at "now" and each step moves the cursor to the
//! timestamp of the entry just read, so the cursor only ever decreases.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    last_seen_timestamp_millis: i64,
}

impl Checkpoint {
    /// Starts a walk at the given wall-clock time
    pub fn starting_at(now_millis: i64) -> Self {
        Self {
            last_seen_timestamp_millis: now_millis,
        }
    }

    /// Timestamp the next query must stay strictly below
    pub fn cursor(&self) -> i64 {
        self.last_seen_timestamp_millis
    }

    /// Moves the cursor to `timestamp_millis`
    ///
    /// Returns `false` and leaves the cursor untouched if the timestamp is
    /// not strictly older than the current cursor.
    pub fn advance(&mut self, timestamp_millis: i64) -> bool {
        if timestamp_millis >= self.last_seen_timestamp_millis {
            return false;
        }
        self.last_seen_timestamp_millis = timestamp_millis;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_backward() {
        let mut checkpoint = Checkpoint::starting_at(1_000);
        assert!(checkpoint.advance(500));
        assert!(checkpoint.advance(300));
        assert_eq!(checkpoint.cursor(), 300);
    }

    #[test]
    fn test_advance_rejects_same_or_newer() {
        let mut checkpoint = Checkpoint::starting_at(1_000);
        assert!(checkpoint.advance(500));
        assert!(!checkpoint.advance(500));
        assert!(!checkpoint.advance(900));
        assert_eq!(checkpoint.cursor(), 500);
    }
}
