//! Service layer
//!
//! Services contain business logic for the collector. They orchestrate
//! operations using stores and sinks and implement the core functionality:
//! draining the crash-entry store, gating runs on constraints, and buffering
//! forwarded records.
//!
//! All services are trait-based to enable testing and dependency injection.

mod collection;
mod constraints;
mod log_buffer;

use siphon_core::domain::job::JobReport;
use siphon_core::domain::schedule::JobIdentity;
use tokio_util::sync::CancellationToken;

// Re-export traits
pub use constraints::ConstraintChecker;
pub use log_buffer::LogBufferService;

// Re-export implementations
pub use collection::{CollectionJob, Drained, ResultPolicy, drain};
pub use constraints::NetworkProbe;
pub use log_buffer::InMemoryLogBuffer;

/// A job the scheduler can run
///
/// Runs are blocking and sequential; the scheduler calls `run_once` on a
/// blocking thread and never overlaps two runs of the same service.
pub trait CollectionService: Send + Sync {
    /// Identity requests must carry to run this service
    fn identity(&self) -> JobIdentity;

    /// Performs one run
    ///
    /// # Arguments
    /// * `cancel` - Checked between entries; once cancelled the run stops
    ///   before the next store query
    fn run_once(&self, cancel: &CancellationToken) -> JobReport;
}
