//! Entry command handlers
//!
//! Lists the entries of a store and adds new ones, mostly useful for seeding
//! a store while testing a collector.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use siphon_collector::store::DirectoryEntryStore;
use siphon_core::domain::entry::EntryInfo;
use std::path::PathBuf;

use crate::config::Config;

/// List entries newest first
pub fn list_entries(config: &Config, limit: Option<usize>, all_tags: bool) -> Result<()> {
    let store = DirectoryEntryStore::open(&config.store_dir)?;
    let tag = (!all_tags).then_some(config.tag.as_str());

    let mut entries = store.list(tag)?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    if entries.is_empty() {
        println!("{}", "No entries found.".yellow());
    } else {
        println!("{}", format!("Found {} entry(ies):", entries.len()).bold());
        println!();
        for entry in &entries {
            print_entry_summary(entry);
        }
    }

    Ok(())
}

/// Add an entry to the store, creating the store directory if needed
pub fn add_entry(
    config: &Config,
    file: Option<PathBuf>,
    text: Option<String>,
    timestamp: Option<i64>,
) -> Result<()> {
    let payload = read_payload(file, text)?;
    let requested = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());

    let store = DirectoryEntryStore::create(&config.store_dir)?;
    let stored = store.add_entry(&config.tag, requested, &payload)?;

    println!(
        "{} Added {}@{} ({} bytes)",
        "✓".green(),
        config.tag.cyan(),
        stored,
        payload.len()
    );
    if stored != requested {
        println!(
            "{}",
            format!("  Timestamp {} was taken, stored as {}", requested, stored).dimmed()
        );
    }

    Ok(())
}

fn read_payload(file: Option<PathBuf>, text: Option<String>) -> Result<Vec<u8>> {
    match (file, text) {
        (Some(path), _) => std::fs::read(&path)
            .with_context(|| format!("Failed to read payload from {}", path.display())),
        (None, Some(text)) => Ok(text.into_bytes()),
        (None, None) => anyhow::bail!("Either --file or --text is required"),
    }
}

fn print_entry_summary(entry: &EntryInfo) {
    let when = DateTime::<Utc>::from_timestamp_millis(entry.timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| entry.timestamp_millis.to_string());

    let size = if entry.lost {
        "lost".red()
    } else {
        format!("{} bytes", entry.size_bytes).normal()
    };

    println!(
        "  {} {}@{}",
        "▸".cyan(),
        entry.tag,
        entry.timestamp_millis.to_string().dimmed()
    );
    println!("    Time: {}", when.dimmed());
    println!("    Size: {}", size);
}
