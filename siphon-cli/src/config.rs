//! Configuration module
//!
//! Handles CLI configuration: which store to operate on and which tag.

use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the entry store
    pub store_dir: PathBuf,
    /// Entry tag commands operate on
    pub tag: String,
}
