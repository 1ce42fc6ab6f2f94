//! Job dispatcher
//!
//! Receives schedule requests, waits for their constraints and runs the
//! collection job on a blocking thread. Requests that arrive while one is
//! pending or running are coalesced into a single follow-up run.

use chrono::Utc;
use siphon_core::domain::job::{JobReport, JobResult, ProcessStats, StopReason};
use siphon_core::domain::schedule::ScheduleRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{JobSubmitter, SubmitError};
use crate::config::Config;
use crate::service::{CollectionService, ConstraintChecker};

/// Timing knobs for the scheduler
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// How often pending requests are re-evaluated
    pub poll_interval: Duration,
    /// A run taking longer than this is cancelled
    pub job_timeout: Duration,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            job_timeout: config.job_timeout,
        }
    }
}

/// Cloneable handle used to submit requests and observe results
#[derive(Clone)]
pub struct SchedulerHandle {
    requests: mpsc::UnboundedSender<ScheduleRequest>,
    reports: watch::Receiver<Option<JobReport>>,
}

impl SchedulerHandle {
    /// Report of the most recent run, if any run finished yet
    pub fn last_report(&self) -> Option<JobReport> {
        self.reports.borrow().clone()
    }

    /// Receiver notified after every finished run
    pub fn subscribe(&self) -> watch::Receiver<Option<JobReport>> {
        self.reports.clone()
    }
}

impl JobSubmitter for SchedulerHandle {
    fn submit(&self, request: ScheduleRequest) -> Result<(), SubmitError> {
        self.requests.send(request).map_err(|_| SubmitError::Closed)
    }
}

/// Scheduler that admits collection runs once constraints hold
pub struct JobScheduler {
    settings: SchedulerSettings,
    job: Arc<dyn CollectionService>,
    checker: Arc<dyn ConstraintChecker>,
    requests: mpsc::UnboundedReceiver<ScheduleRequest>,
    reports: watch::Sender<Option<JobReport>>,
    pending: Option<ScheduleRequest>,
}

impl JobScheduler {
    /// Creates a new scheduler and the handle used to feed it
    pub fn new(
        settings: SchedulerSettings,
        job: Arc<dyn CollectionService>,
        checker: Arc<dyn ConstraintChecker>,
    ) -> (Self, SchedulerHandle) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = watch::channel(None);

        let scheduler = Self {
            settings,
            job,
            checker,
            requests: request_rx,
            reports: report_tx,
            pending: None,
        };

        let handle = SchedulerHandle {
            requests: request_tx,
            reports: report_rx,
        };

        (scheduler, handle)
    }

    /// Runs until `shutdown` is cancelled, or until every handle is dropped
    /// and nothing is left pending
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "Starting job scheduler (interval: {:?}, timeout: {:?})",
            self.settings.poll_interval, self.settings.job_timeout
        );

        let mut ticker = time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut accepting = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Scheduler shutting down");
                    break;
                }
                request = self.requests.recv(), if accepting => match request {
                    Some(request) => self.accept(request),
                    None => {
                        debug!("All submitters dropped");
                        accepting = false;
                    }
                },
                _ = ticker.tick() => {}
            }

            self.run_pending(&shutdown).await;

            if !accepting && self.pending.is_none() {
                info!("No submitters and nothing pending, scheduler stopping");
                break;
            }
        }
    }

    fn accept(&mut self, request: ScheduleRequest) {
        if request.job != self.job.identity() {
            warn!("Ignoring request for unknown job '{}'", request.job);
            return;
        }

        if self.pending.is_some() {
            debug!(
                "Coalescing {} request into pending {} run",
                request.reason, request.job
            );
        } else {
            debug!("Queued {} run ({} trigger)", request.job, request.reason);
        }

        self.pending = Some(request);
    }

    async fn run_pending(&mut self, shutdown: &CancellationToken) {
        let Some(constraints) = self.pending.as_ref().map(|request| request.constraints) else {
            return;
        };

        if shutdown.is_cancelled() {
            return;
        }

        if !self.checker.satisfied(&constraints).await {
            debug!("Constraints {:?} not satisfied, deferring run", constraints);
            return;
        }

        let Some(request) = self.pending.take() else {
            return;
        };

        info!(
            "Admitting {} run ({} trigger, requested at {})",
            request.job, request.reason, request.requested_at
        );

        let report = self.execute(shutdown).await;
        self.reports.send_replace(Some(report));
    }

    /// Runs the job once on a blocking thread, cancelling it on timeout
    async fn execute(&self, shutdown: &CancellationToken) -> JobReport {
        let cancel = shutdown.child_token();
        let run_cancel = cancel.clone();
        let job = Arc::clone(&self.job);
        let started_at = Utc::now();

        let mut handle = tokio::task::spawn_blocking(move || job.run_once(&run_cancel));

        let joined = match time::timeout(self.settings.job_timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    "Collection run exceeded {:?}, cancelling",
                    self.settings.job_timeout
                );
                cancel.cancel();
                handle.await
            }
        };

        match joined {
            Ok(report) => report,
            Err(e) => {
                error!("Collection task failed: {}", e);
                JobReport {
                    run_id: Uuid::new_v4(),
                    result: JobResult::Failure,
                    stop: StopReason::Aborted,
                    stats: ProcessStats::default(),
                    error: Some(e.to_string()),
                    started_at,
                    finished_at: Utc::now(),
                }
            }
        }
    }
}
