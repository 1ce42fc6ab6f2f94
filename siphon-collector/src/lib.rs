//! Siphon Collector
//!
//! Library half of the collector daemon. The CLI links against it to run a
//! single collection and to inspect or seed the entry store.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod shutdown;
pub mod sink;
pub mod store;
pub mod trigger;
