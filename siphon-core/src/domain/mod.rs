//! Core domain types
//!
//! This module contains the domain structures used across Siphon components.
//! The collector daemon produces and consumes them; the CLI renders them.

pub mod checkpoint;
pub mod entry;
pub mod job;
pub mod log;
pub mod schedule;
