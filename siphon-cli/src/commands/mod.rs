//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod collect;
mod entries;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one collection now, bypassing the scheduler
    Collect {
        /// Print the report and forwarded entries as JSON
        #[arg(long)]
        json: bool,

        /// Report success even when the store cannot be opened or read
        #[arg(long)]
        lenient: bool,
    },
    /// List entries newest first
    List {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Include entries of every tag
        #[arg(long)]
        all_tags: bool,
    },
    /// Add an entry to the store
    #[command(group(
        clap::ArgGroup::new("payload")
            .required(true)
            .args(["file", "text"])
    ))]
    Add {
        /// Read the payload from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Use this text as the payload
        #[arg(long)]
        text: Option<String>,

        /// Entry timestamp in milliseconds since the epoch (default: now)
        #[arg(long)]
        timestamp: Option<i64>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Collect { json, lenient } => collect::run_collect(config, json, lenient),
        Commands::List { limit, all_tags } => entries::list_entries(config, limit, all_tags),
        Commands::Add {
            file,
            text,
            timestamp,
        } => entries::add_entry(config, file, text, timestamp),
    }
}
