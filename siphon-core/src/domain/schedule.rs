//! Schedule request domain types
//!
//! A schedule request is what a trigger hands to the scheduler: which job to
//! run and under which environmental constraints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a schedulable job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIdentity(String);

impl JobIdentity {
    /// The crash-log collection job
    pub const COLLECTION: &'static str = "crash-log-collection";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn collection() -> Self {
        Self::new(Self::COLLECTION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conditions that must hold before a job is admitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub requires_network: bool,
}

impl Constraints {
    pub fn network() -> Self {
        Self {
            requires_network: true,
        }
    }
}

/// What caused a schedule request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerReason {
    /// Collector process started
    Startup,
    /// Operator signal (SIGUSR1)
    Signal,
    /// Periodic trigger timer
    Timer,
    /// Explicit request from code or tooling
    Manual,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Startup => write!(f, "startup"),
            TriggerReason::Signal => write!(f, "signal"),
            TriggerReason::Timer => write!(f, "timer"),
            TriggerReason::Manual => write!(f, "manual"),
        }
    }
}

/// Request to schedule a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub job: JobIdentity,
    pub constraints: Constraints,
    pub reason: TriggerReason,
    pub requested_at: DateTime<Utc>,
}

impl ScheduleRequest {
    pub fn new(job: JobIdentity, constraints: Constraints, reason: TriggerReason) -> Self {
        Self {
            job,
            constraints,
            reason,
            requested_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_identity() {
        assert_eq!(JobIdentity::collection().as_str(), "crash-log-collection");
        assert_eq!(JobIdentity::collection(), JobIdentity::new(JobIdentity::COLLECTION));
    }

    #[test]
    fn test_request_serializes() {
        let request = ScheduleRequest::new(
            JobIdentity::collection(),
            Constraints::network(),
            TriggerReason::Signal,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["job"], "crash-log-collection");
        assert_eq!(json["constraints"]["requires_network"], true);
        assert_eq!(json["reason"], "Signal");
    }
}
