//! Collection service
//!
//! Drains the crash-entry store and forwards every entry to a log sink:
//! - Walking the store backward in time, starting at "now"
//! - Decoding each payload as UTF-8 and emitting it with its tag
//! - Isolating unreadable or undecodable entries so one bad entry does not
//!   abort the drain
//!
//! Each entry is fully read and released before the next store query.

use chrono::Utc;
use siphon_core::domain::checkpoint::Checkpoint;
use siphon_core::domain::entry::CrashEntry;
use siphon_core::domain::job::{JobReport, JobResult, ProcessStats, StopReason};
use siphon_core::domain::schedule::JobIdentity;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::CollectionService;
use crate::error::{CollectError, EntryError, StoreError};
use crate::sink::LogSink;
use crate::store::{EntryStore, StoreOpener};

/// How run errors map onto the job result
///
/// Entry-level failures never fail a run under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultPolicy {
    /// Failure when the store cannot be opened, a query fails or the run is
    /// cancelled
    #[default]
    Reporting,
    /// Success on every path, errors are only logged
    Lenient,
}

impl ResultPolicy {
    fn failure(&self) -> JobResult {
        match self {
            ResultPolicy::Reporting => JobResult::Failure,
            ResultPolicy::Lenient => JobResult::Success,
        }
    }
}

impl FromStr for ResultPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reporting" | "strict" => Ok(ResultPolicy::Reporting),
            "lenient" => Ok(ResultPolicy::Lenient),
            other => anyhow::bail!("unknown result policy '{}'", other),
        }
    }
}

/// A drain that reached its lower bound with every entry forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained {
    pub stats: ProcessStats,
    pub stop: StopReason,
}

/// Drains `store` from `now_millis` backward, forwarding entries to `sink`
///
/// The walk stops when the store has no older entry, when it reaches an
/// entry at or below `floor_millis`, when a query fails, or when `cancel` is
/// triggered (checked before every query). Entries that cannot be read or
/// decoded are counted and skipped; the cursor still moves past them. If
/// any were skipped the result is [`CollectError::PartialDecodeFailures`].
pub fn drain(
    store: &dyn EntryStore,
    sink: &dyn LogSink,
    tag: &str,
    now_millis: i64,
    floor_millis: Option<i64>,
    cancel: &CancellationToken,
) -> Result<Drained, CollectError> {
    let mut checkpoint = Checkpoint::starting_at(now_millis);
    let mut stats = ProcessStats::default();

    let stop = loop {
        if cancel.is_cancelled() {
            debug!("Collection cancelled at cursor {}", checkpoint.cursor());
            return Err(CollectError::Cancelled { stats });
        }

        let entry = match store.next_entry_before(tag, checkpoint.cursor()) {
            Ok(Some(entry)) => entry,
            Ok(None) => break StopReason::Exhausted,
            Err(source) => return Err(CollectError::StoreReadError { source, stats }),
        };

        let timestamp = entry.timestamp_millis();
        let cursor = checkpoint.cursor();
        if !checkpoint.advance(timestamp) {
            return Err(CollectError::StoreReadError {
                source: StoreError::OutOfOrder { cursor, timestamp },
                stats,
            });
        }

        if floor_millis.is_some_and(|floor| timestamp <= floor) {
            debug!("Reached previously drained entry {}@{}", tag, timestamp);
            break StopReason::ReachedCheckpoint;
        }

        stats.observe(timestamp);
        match forward(entry, sink) {
            Ok(()) => stats.processed += 1,
            Err(e) => {
                stats.failed += 1;
                warn!("Skipping entry {}@{}: {}", tag, timestamp, e);
            }
        }
    };

    if stats.failed > 0 {
        return Err(CollectError::PartialDecodeFailures {
            failed: stats.failed,
            stats,
            stop,
        });
    }

    Ok(Drained { stats, stop })
}

/// Reads, decodes and emits one entry
///
/// Takes the entry by value so it is released on every path.
fn forward(mut entry: CrashEntry, sink: &dyn LogSink) -> Result<(), EntryError> {
    let bytes = entry.read_payload()?;
    let text = String::from_utf8(bytes)?;
    sink.emit(entry.tag(), &text);
    entry.close();
    Ok(())
}

/// The crash-log collection job
///
/// Collaborators are injected: a store opener (the store is opened fresh for
/// every run) and the sink drained entries are forwarded to.
pub struct CollectionJob {
    opener: Arc<dyn StoreOpener>,
    sink: Arc<dyn LogSink>,
    tag: String,
    policy: ResultPolicy,
    skip_seen: bool,
    /// Newest timestamp of the last complete drain, only kept with `skip_seen`
    floor: Mutex<Option<i64>>,
}

impl CollectionJob {
    pub fn new(
        opener: Arc<dyn StoreOpener>,
        sink: Arc<dyn LogSink>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            opener,
            sink,
            tag: tag.into(),
            policy: ResultPolicy::default(),
            skip_seen: false,
            floor: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: ResultPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop each walk at the newest entry of the last complete run
    ///
    /// The floor lives in memory only; a restarted collector drains
    /// everything again.
    pub fn with_skip_seen(mut self, skip_seen: bool) -> Self {
        self.skip_seen = skip_seen;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn checkpoint_floor(&self) -> Option<i64> {
        *self.floor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the store and drains it
    pub fn collect(
        &self,
        now_millis: i64,
        cancel: &CancellationToken,
    ) -> Result<Drained, CollectError> {
        let store = self.opener.open().map_err(CollectError::StoreUnavailable)?;

        let floor = if self.skip_seen {
            self.checkpoint_floor()
        } else {
            None
        };

        let result = drain(
            store.as_ref(),
            self.sink.as_ref(),
            &self.tag,
            now_millis,
            floor,
            cancel,
        );

        if self.skip_seen {
            self.update_floor(&result);
        }

        result
    }

    fn update_floor(&self, result: &Result<Drained, CollectError>) {
        let (stats, stop) = match result {
            Ok(drained) => (drained.stats, drained.stop),
            Err(e) => (e.stats(), e.stop_reason()),
        };

        // An incomplete walk leaves a gap below the entries it reached
        if !stop.is_complete() {
            return;
        }

        if let Some(newest) = stats.newest_timestamp_millis {
            let mut floor = self.floor.lock().unwrap_or_else(PoisonError::into_inner);
            *floor = Some(floor.map_or(newest, |current| current.max(newest)));
        }
    }

    /// Performs one run as if the wall clock read `now_millis`
    pub fn run_once_at(&self, now_millis: i64, cancel: &CancellationToken) -> JobReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!("Starting collection run {} for tag '{}'", run_id, self.tag);

        let (result, stop, stats, error) = match self.collect(now_millis, cancel) {
            Ok(drained) => (JobResult::Success, drained.stop, drained.stats, None),
            Err(e @ CollectError::PartialDecodeFailures { .. }) => {
                warn!("Collection run {}: {}", run_id, e);
                (
                    JobResult::Success,
                    e.stop_reason(),
                    e.stats(),
                    Some(e.to_string()),
                )
            }
            Err(e) => {
                let result = self.policy.failure();
                if result.is_success() {
                    warn!("Collection run {} ended early: {}", run_id, e);
                } else {
                    error!("Collection run {} failed: {}", run_id, e);
                }
                (result, e.stop_reason(), e.stats(), Some(e.to_string()))
            }
        };

        info!(
            "Collection run {} finished with {} ({} processed, {} failed, stop: {:?})",
            run_id, result, stats.processed, stats.failed, stop
        );

        JobReport {
            run_id,
            result,
            stop,
            stats,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

impl CollectionService for CollectionJob {
    fn identity(&self) -> JobIdentity {
        JobIdentity::collection()
    }

    fn run_once(&self, cancel: &CancellationToken) -> JobReport {
        self.run_once_at(Utc::now().timestamp_millis(), cancel)
    }
}
