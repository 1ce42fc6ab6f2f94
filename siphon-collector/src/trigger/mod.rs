//! Trigger layer
//!
//! Turns external events into schedule requests for the collection job.
//! The listener never runs the job itself and never waits for it; deciding
//! when the job actually runs is left to the scheduler.

mod sources;

use siphon_core::domain::schedule::{Constraints, JobIdentity, ScheduleRequest, TriggerReason};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::scheduler::JobSubmitter;

pub use sources::{spawn_signal_trigger, spawn_timer_trigger};

/// Submits a collection request for every event it receives
pub struct TriggerListener {
    submitter: Arc<dyn JobSubmitter>,
    constraints: Constraints,
}

impl TriggerListener {
    /// Creates a new trigger listener
    ///
    /// # Arguments
    /// * `submitter` - Where requests are sent
    /// * `constraints` - Constraints attached to every request
    pub fn new(submitter: Arc<dyn JobSubmitter>, constraints: Constraints) -> Self {
        Self {
            submitter,
            constraints,
        }
    }

    /// Handles one event. Submission failures are logged, not returned.
    pub fn on_event(&self, reason: TriggerReason) {
        let request = ScheduleRequest::new(JobIdentity::collection(), self.constraints, reason);

        match self.submitter.submit(request) {
            Ok(()) => debug!("Submitted collection request ({} trigger)", reason),
            Err(e) => warn!("Failed to submit collection request ({} trigger): {}", reason, e),
        }
    }
}
