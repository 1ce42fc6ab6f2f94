//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Terminal outcome reported to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobResult {
    Success,
    Failure,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success)
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResult::Success => write!(f, "success"),
            JobResult::Failure => write!(f, "failure"),
        }
    }
}

/// Why a drain stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The store had no older entry
    Exhausted,
    /// The walk reached entries already drained by an earlier run
    ReachedCheckpoint,
    /// The store could not be opened
    StoreUnavailable,
    /// Querying the store failed
    StoreReadError,
    /// The run was cancelled between entries
    Cancelled,
    /// The run ended abnormally before it could report
    Aborted,
}

impl StopReason {
    /// Whether the walk covered everything down to its lower bound
    pub fn is_complete(&self) -> bool {
        matches!(self, StopReason::Exhausted | StopReason::ReachedCheckpoint)
    }
}

/// Counters for one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Entries decoded and forwarded to the sink
    pub processed: u64,
    /// Entries whose payload could not be read or decoded
    pub failed: u64,
    pub newest_timestamp_millis: Option<i64>,
    pub oldest_timestamp_millis: Option<i64>,
}

impl ProcessStats {
    /// Records that an entry with `timestamp_millis` was visited
    pub fn observe(&mut self, timestamp_millis: i64) {
        if self.newest_timestamp_millis.is_none() {
            self.newest_timestamp_millis = Some(timestamp_millis);
        }
        self.oldest_timestamp_millis = Some(timestamp_millis);
    }

    pub fn visited(&self) -> u64 {
        self.processed + self.failed
    }
}

/// Report of one collection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub result: JobResult,
    pub stop: StopReason,
    pub stats: ProcessStats,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_observe_tracks_range() {
        let mut stats = ProcessStats::default();
        stats.observe(500);
        stats.observe(300);
        stats.observe(100);

        assert_eq!(stats.newest_timestamp_millis, Some(500));
        assert_eq!(stats.oldest_timestamp_millis, Some(100));
    }

    #[test]
    fn test_stop_reason_completeness() {
        assert!(StopReason::Exhausted.is_complete());
        assert!(StopReason::ReachedCheckpoint.is_complete());
        assert!(!StopReason::Cancelled.is_complete());
        assert!(!StopReason::StoreReadError.is_complete());
        assert!(!StopReason::StoreUnavailable.is_complete());
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let report = JobReport {
            run_id: Uuid::new_v4(),
            result: JobResult::Success,
            stop: StopReason::Exhausted,
            stats: ProcessStats {
                processed: 3,
                failed: 1,
                newest_timestamp_millis: Some(500),
                oldest_timestamp_millis: Some(100),
            },
            error: None,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let json = serde_json::to_string(&report).unwrap();
        let parsed: JobReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.stats, report.stats);
        assert_eq!(parsed.result, JobResult::Success);
    }
}
