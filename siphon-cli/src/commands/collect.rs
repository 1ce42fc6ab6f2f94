//! Collect command handler
//!
//! Runs the collection job once, in process, with a buffered sink so the
//! forwarded entries can be printed afterwards.

use anyhow::{Result, bail};
use chrono::Utc;
use colored::*;
use siphon_collector::service::{
    CollectionJob, InMemoryLogBuffer, LogBufferService, ResultPolicy,
};
use siphon_collector::sink::BufferedLogSink;
use siphon_collector::store::DirectoryStoreOpener;
use siphon_core::domain::job::{JobReport, JobResult, StopReason};
use siphon_core::domain::log::LogRecord;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Handle the collect command
pub fn run_collect(config: &Config, json: bool, lenient: bool) -> Result<()> {
    let (report, records) = collect_once(config, lenient);

    if json {
        let output = serde_json::json!({
            "report": report,
            "entries": records,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_records(&records);
        print_report(&report);
    }

    if report.result == JobResult::Failure {
        bail!(
            "Collection failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

/// Runs one collection and returns its report with every forwarded record
fn collect_once(config: &Config, lenient: bool) -> (JobReport, Vec<LogRecord>) {
    let buffer = Arc::new(InMemoryLogBuffer::new());
    let sink = Arc::new(BufferedLogSink::new(buffer.clone()));
    let opener = Arc::new(DirectoryStoreOpener::new(config.store_dir.clone()));

    let policy = if lenient {
        ResultPolicy::Lenient
    } else {
        ResultPolicy::Reporting
    };
    let job = CollectionJob::new(opener, sink, config.tag.clone()).with_policy(policy);

    let report = job.run_once_at(Utc::now().timestamp_millis(), &CancellationToken::new());
    (report, buffer.drain())
}

fn print_records(records: &[LogRecord]) {
    if records.is_empty() {
        println!("{}", "No entries forwarded.".yellow());
        return;
    }

    println!(
        "{}",
        format!("Forwarded {} entry(ies):", records.len()).bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for record in records {
        println!("{} {}", "▸".cyan(), record.tag.cyan());
        println!("{}", record.message.trim_end());
        println!("{}", "─".repeat(80).dimmed());
    }
}

fn print_report(report: &JobReport) {
    let result = match report.result {
        JobResult::Success => "✓ success".green(),
        JobResult::Failure => "✗ failure".red(),
    };

    println!("{}", "Collection Report:".bold());
    println!("  Run:        {}", report.run_id.to_string().dimmed());
    println!("  Result:     {}", result);
    println!("  Stopped:    {}", describe_stop(report.stop));
    println!("  Processed:  {}", report.stats.processed);
    if report.stats.failed > 0 {
        println!(
            "  Failed:     {}",
            report.stats.failed.to_string().yellow()
        );
    }
    if let (Some(newest), Some(oldest)) = (
        report.stats.newest_timestamp_millis,
        report.stats.oldest_timestamp_millis,
    ) {
        println!("  Range:      {} .. {}", oldest, newest);
    }
    let duration = report
        .finished_at
        .signed_duration_since(report.started_at)
        .num_milliseconds();
    println!("  Duration:   {}ms", duration);

    if let Some(error) = &report.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn describe_stop(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Exhausted => "store exhausted",
        StopReason::ReachedCheckpoint => "reached checkpoint",
        StopReason::StoreUnavailable => "store unavailable",
        StopReason::StoreReadError => "store read error",
        StopReason::Cancelled => "cancelled",
        StopReason::Aborted => "aborted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siphon_collector::store::DirectoryEntryStore;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> Config {
        Config {
            store_dir: dir.path().to_path_buf(),
            tag: "crash".to_string(),
        }
    }

    #[test]
    fn test_collect_once_forwards_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryEntryStore::open(dir.path()).unwrap();
        store.add_entry("crash", 100, b"done").unwrap();
        store.add_entry("crash", 300, b"world").unwrap();
        store.add_entry("crash", 500, b"hello").unwrap();
        store.add_entry("anr", 400, b"other tag").unwrap();

        let (report, records) = collect_once(&config_for(&dir), false);

        assert_eq!(report.result, JobResult::Success);
        assert_eq!(report.stats.processed, 3);
        let messages: Vec<&str> = records.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["hello", "world", "done"]);
    }

    #[test]
    fn test_collect_once_missing_store() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            store_dir: dir.path().join("missing"),
            tag: "crash".to_string(),
        };

        let (report, records) = collect_once(&config, false);
        assert_eq!(report.result, JobResult::Failure);
        assert_eq!(report.stop, StopReason::StoreUnavailable);
        assert!(records.is_empty());

        let (report, _) = collect_once(&config, true);
        assert_eq!(report.result, JobResult::Success);
    }
}
