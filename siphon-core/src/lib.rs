//! Siphon Core
//!
//! Core types shared by the Siphon crash-log collector and its CLI.
//!
//! This crate contains:
//! - Domain types: crash entries, the drain checkpoint, schedule requests,
//!   job results and the records handed to log sinks

pub mod domain;
