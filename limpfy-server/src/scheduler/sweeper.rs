//! Settlement sweeper
//!
//! Periodically settles every job whose dispute deadline has passed. The
//! persisted `dispute_deadline` is the only state it relies on, so a restart
//! simply picks the backlog up on the next tick.
//!
//! Each settlement goes through the same read/validate/compare-and-swap path
//! as a request, so a dispute committed first wins and the sweep skips it.

use limpfy_core::domain::actor::Actor;
use limpfy_core::lifecycle::{Action, TransitionError};
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::service::{JobError, JobService};

/// Counts of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Jobs found due at the start of the pass
    pub examined: usize,
    pub settled: usize,
    /// Jobs another path moved first
    pub skipped: usize,
    /// Jobs left for the next pass after an infrastructure error
    pub failed: usize,
}

pub struct SettlementSweeper {
    service: JobService,
    interval: Duration,
}

impl SettlementSweeper {
    pub fn new(service: JobService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Runs the sweep loop until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Starting settlement sweep (interval: {:?})", self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Settlement sweep stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(report) if report.examined > 0 => {
                            info!(
                                "Sweep settled {} of {} due job(s) ({} skipped, {} failed)",
                                report.settled, report.examined, report.skipped, report.failed
                            );
                        }
                        Ok(_) => debug!("No jobs due for settlement"),
                        Err(e) => error!("Error during sweep: {}", e),
                    }
                }
            }
        }
    }

    /// Performs a single sweep pass
    pub async fn sweep_once(&self) -> Result<SweepReport, JobError> {
        let due = self.service.jobs_due_for_settlement().await?;
        let system = Actor::system();

        let mut report = SweepReport {
            examined: due.len(),
            ..Default::default()
        };

        for job in due {
            match self
                .service
                .apply_transition(job.id, &system, Action::Settle)
                .await
            {
                Ok(_) => report.settled += 1,
                Err(JobError::Transition(
                    e @ (TransitionError::Conflict { .. }
                    | TransitionError::WrongState { .. }
                    | TransitionError::DeadlineNotReached { .. }
                    | TransitionError::NotFound(_)),
                )) => {
                    debug!(job_id = %job.id, "Skipping settlement: {}", e);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(job_id = %job.id, "Failed to settle job: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
