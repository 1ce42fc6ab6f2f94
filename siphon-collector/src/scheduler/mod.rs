//! Scheduler layer for the collector
//!
//! This layer stands in for a platform job scheduler: it accepts schedule
//! requests from triggers, holds them until their constraints are satisfied
//! and runs the collection job, one run at a time.

mod dispatcher;

use siphon_core::domain::schedule::ScheduleRequest;
use thiserror::Error;

pub use dispatcher::{JobScheduler, SchedulerHandle, SchedulerSettings};

/// Errors returned when submitting a schedule request
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The scheduler is no longer running
    #[error("scheduler is not accepting requests")]
    Closed,
}

/// Accepts schedule requests on behalf of a scheduler
pub trait JobSubmitter: Send + Sync {
    /// Hands a request to the scheduler without waiting for the job
    fn submit(&self, request: ScheduleRequest) -> Result<(), SubmitError>;
}
