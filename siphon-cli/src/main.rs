//! Siphon CLI
//!
//! Command-line interface for running one-off collections against a crash
//! entry store and for inspecting or seeding that store.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siphon")]
#[command(about = "Siphon crash log collector CLI", long_about = None)]
struct Cli {
    /// Entry store directory
    #[arg(
        long,
        global = true,
        env = "COLLECTOR_STORE_DIR",
        default_value = "/var/lib/siphon/dropbox"
    )]
    store_dir: PathBuf,

    /// Entry tag
    #[arg(
        long,
        global = true,
        env = "COLLECTOR_TAG",
        default_value = "system_app_crash"
    )]
    tag: String,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        store_dir: cli.store_dir,
        tag: cli.tag,
    };

    handle_command(cli.command, &config)
}
