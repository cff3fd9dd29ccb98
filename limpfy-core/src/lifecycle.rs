//! Job lifecycle engine
//!
//! Pure state machine validating a requested action against the current job
//! record and the acting user. It never touches storage: callers commit the
//! returned job with a compare-and-swap and publish the returned events only
//! after that commit succeeds.
//!
//! ```text
//! pending ──accept──▶ in-progress ──complete──▶ waiting-for-rating ──settle/confirm──▶ paid-out
//!    │  ▲                 │                         │
//!  cancel│reactivate    cancel                  open-dispute
//!    ▼  │                 ▼                         ▼
//! cancelled-by-client   cancelled-by-{client,worker}   dispute
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::actor::{Actor, Role};
use crate::domain::event::{JobEvent, JobEventKind};
use crate::domain::job::{Job, JobStatus, Rating};
use crate::dto::job::UpdateJob;

/// Default length of the dispute window
pub const DEFAULT_DISPUTE_WINDOW_MINUTES: i64 = 30;

/// Default inbox receiving help requests
pub const DEFAULT_SUPPORT_INBOX: &str = "support";

/// Business parameters of the lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Time between completion and automatic payout
    pub dispute_window: Duration,

    /// Recipient id of the support team inbox
    pub support_inbox: String,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            dispute_window: Duration::minutes(DEFAULT_DISPUTE_WINDOW_MINUTES),
            support_inbox: DEFAULT_SUPPORT_INBOX.to_string(),
        }
    }
}

/// A transition requested by an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    Accept,
    Complete { proof_of_completion: Option<String> },
    Cancel,
    Reactivate,
    OpenDispute { reason: Option<String> },
    Rate { score: u8, comment: Option<String> },
    Confirm,
    Settle,
    Edit(UpdateJob),
    RequestHelp { message: Option<String> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Complete { .. } => "complete",
            Action::Cancel => "cancel",
            Action::Reactivate => "reactivate",
            Action::OpenDispute { .. } => "open-dispute",
            Action::Rate { .. } => "rate",
            Action::Confirm => "confirm",
            Action::Settle => "settle",
            Action::Edit(_) => "edit",
            Action::RequestHelp { .. } => "request-help",
        }
    }
}

/// What the caller should offer next after a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recovery {
    /// The record changed underneath the caller; fetch it again
    Refetch,
    /// The dispute window is closed; route to manual support
    RequestHelp,
    /// The dispute window is still open; a dispute is the right channel
    OpenDispute,
    None,
}

/// Why a transition was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("cannot {action} a job that is {status}")]
    WrongState {
        action: &'static str,
        status: JobStatus,
    },

    #[error("{role} {actor_id} is not allowed to {action} this job")]
    NotAuthorized {
        action: &'static str,
        actor_id: String,
        role: Role,
    },

    #[error("missing required field: {0}")]
    MissingPayload(&'static str),

    #[error("invalid request: {0}")]
    InvalidPayload(String),

    #[error("the dispute window closed at {deadline}")]
    DeadlinePassed { deadline: DateTime<Utc> },

    #[error("cannot {action} before the dispute window closes at {deadline}")]
    DeadlineNotReached {
        action: &'static str,
        deadline: DateTime<Utc>,
    },

    #[error("job was already rated")]
    AlreadyRated,

    #[error("job {job_id} was changed by someone else")]
    Conflict { job_id: Uuid },
}

impl TransitionError {
    /// Stable machine-readable code
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionError::NotFound(_) => "not-found",
            TransitionError::WrongState { .. } => "wrong-state",
            TransitionError::NotAuthorized { .. } => "not-authorized",
            TransitionError::MissingPayload(_) => "missing-payload",
            TransitionError::InvalidPayload(_) => "invalid-payload",
            TransitionError::DeadlinePassed { .. } => "deadline-passed",
            TransitionError::DeadlineNotReached { .. } => "deadline-not-reached",
            TransitionError::AlreadyRated => "already-rated",
            TransitionError::Conflict { .. } => "conflict",
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            TransitionError::Conflict { .. } => Recovery::Refetch,
            TransitionError::DeadlinePassed { .. } => Recovery::RequestHelp,
            TransitionError::DeadlineNotReached { action, .. } if *action == "request-help" => {
                Recovery::OpenDispute
            }
            _ => Recovery::None,
        }
    }
}

/// Result of a validated transition
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The job to commit (identical to the input when `changed` is false)
    pub job: Job,
    pub previous_status: JobStatus,
    pub changed: bool,
    /// Events to publish once the commit succeeded
    pub events: Vec<JobEvent>,
}

impl Outcome {
    /// Whether this transition moved the job into `paid-out`
    pub fn releases_payment(&self) -> bool {
        self.previous_status != JobStatus::PaidOut && self.job.status == JobStatus::PaidOut
    }
}

/// Validates `action` by `actor` against `job` at time `now`.
pub fn apply(
    job: &Job,
    actor: &Actor,
    action: &Action,
    now: DateTime<Utc>,
    policy: &LifecyclePolicy,
) -> Result<Outcome, TransitionError> {
    let name = action.name();
    let mut next = job.clone();

    let (kind, recipients) = match action {
        Action::Accept => {
            require_role(actor, Role::Worker, name)?;
            if job.status != JobStatus::Pending {
                // Already taken or withdrawn: the caller lost the race.
                return Err(TransitionError::Conflict { job_id: job.id });
            }
            next.worker_id = Some(actor.id.clone());
            next.status = JobStatus::InProgress;
            next.accepted_at = Some(now);
            (JobEventKind::JobAccepted, vec![job.client_id.clone()])
        }

        Action::Complete {
            proof_of_completion,
        } => {
            require_role(actor, Role::Worker, name)?;
            require_status(job, &[JobStatus::InProgress], name)?;
            require_assigned_worker(job, actor, name)?;
            let proof = non_blank(proof_of_completion.as_deref())
                .ok_or(TransitionError::MissingPayload("proof_of_completion"))?;

            next.status = JobStatus::WaitingForRating;
            next.proof_of_completion = Some(proof);
            next.completed_at = Some(now);
            if next.dispute_deadline.is_none() {
                next.dispute_deadline = Some(now + policy.dispute_window);
            }
            (JobEventKind::JobCompleted, vec![job.client_id.clone()])
        }

        Action::Cancel => match actor.role {
            Role::Client => {
                require_owner(job, actor, name)?;
                require_status(job, &[JobStatus::Pending, JobStatus::InProgress], name)?;
                release_worker(&mut next, now);
                next.status = JobStatus::CancelledByClient;
                (
                    JobEventKind::JobCancelledByClient,
                    job.worker_id.iter().cloned().collect(),
                )
            }
            Role::Worker => {
                require_status(job, &[JobStatus::Pending, JobStatus::InProgress], name)?;
                require_assigned_worker(job, actor, name)?;
                release_worker(&mut next, now);
                next.status = JobStatus::CancelledByWorker;
                (
                    JobEventKind::JobCancelledByWorker,
                    vec![job.client_id.clone()],
                )
            }
            Role::System => return Err(not_authorized(actor, name)),
        },

        Action::Reactivate => {
            require_role(actor, Role::Client, name)?;
            require_owner(job, actor, name)?;
            require_status(job, &[JobStatus::CancelledByClient], name)?;
            next.status = JobStatus::Pending;
            next.cancelled_at = None;
            (JobEventKind::JobReactivated, Vec::new())
        }

        Action::Edit(changes) => {
            require_role(actor, Role::Client, name)?;
            require_owner(job, actor, name)?;
            require_status(job, &[JobStatus::Pending], name)?;
            apply_changes(&mut next, changes)?;
            (JobEventKind::JobUpdated, Vec::new())
        }

        Action::OpenDispute { reason } => {
            require_role(actor, Role::Client, name)?;
            require_owner(job, actor, name)?;
            require_status(job, &[JobStatus::WaitingForRating], name)?;
            let deadline = deadline_of(job, name)?;
            if now >= deadline {
                return Err(TransitionError::DeadlinePassed { deadline });
            }
            next.status = JobStatus::Dispute;
            next.disputed_at = Some(now);
            next.dispute_reason = non_blank(reason.as_deref());
            (JobEventKind::DisputeOpened, assigned_worker(job))
        }

        Action::Rate { score, comment } => {
            require_role(actor, Role::Client, name)?;
            require_owner(job, actor, name)?;
            require_status(job, &[JobStatus::WaitingForRating], name)?;
            if job.is_rated() {
                return Err(TransitionError::AlreadyRated);
            }
            if !(1..=5).contains(score) {
                return Err(TransitionError::InvalidPayload(format!(
                    "rating must be between 1 and 5 (got {score})"
                )));
            }
            next.rating = Some(Rating {
                score: *score,
                comment: non_blank(comment.as_deref()),
                rated_at: now,
            });
            (JobEventKind::JobRated, assigned_worker(job))
        }

        Action::Confirm => {
            require_role(actor, Role::Client, name)?;
            require_owner(job, actor, name)?;
            require_status(job, &[JobStatus::WaitingForRating], name)?;
            next.status = JobStatus::PaidOut;
            next.paid_out_at = Some(now);
            (JobEventKind::CompletionConfirmed, assigned_worker(job))
        }

        Action::Settle => {
            require_role(actor, Role::System, name)?;
            require_status(job, &[JobStatus::WaitingForRating], name)?;
            let deadline = deadline_of(job, name)?;
            if now < deadline {
                return Err(TransitionError::DeadlineNotReached {
                    action: name,
                    deadline,
                });
            }
            next.status = JobStatus::PaidOut;
            next.paid_out_at = Some(now);
            let mut recipients = vec![job.client_id.clone()];
            recipients.extend(assigned_worker(job));
            (JobEventKind::PaymentReleased, recipients)
        }

        Action::RequestHelp { .. } => {
            require_role(actor, Role::Client, name)?;
            require_owner(job, actor, name)?;
            require_status(
                job,
                &[
                    JobStatus::WaitingForRating,
                    JobStatus::Dispute,
                    JobStatus::PaidOut,
                ],
                name,
            )?;
            if job.status == JobStatus::WaitingForRating && job.dispute_window_open(now) {
                return Err(TransitionError::DeadlineNotReached {
                    action: name,
                    deadline: deadline_of(job, name)?,
                });
            }
            let event = JobEvent::new(
                job,
                JobEventKind::HelpRequested,
                vec![policy.support_inbox.clone(), job.client_id.clone()],
                now,
            );
            return Ok(Outcome {
                job: job.clone(),
                previous_status: job.status,
                changed: false,
                events: vec![event],
            });
        }
    };

    next.updated_at = now;
    debug_assert!(
        next.assignment_consistent(),
        "{name} left job {} inconsistent",
        next.id
    );

    let event = JobEvent::new(&next, kind, recipients, now);
    Ok(Outcome {
        job: next,
        previous_status: job.status,
        changed: true,
        events: vec![event],
    })
}

// =============================================================================
// Guards
// =============================================================================

fn not_authorized(actor: &Actor, action: &'static str) -> TransitionError {
    TransitionError::NotAuthorized {
        action,
        actor_id: actor.id.clone(),
        role: actor.role,
    }
}

fn require_role(actor: &Actor, role: Role, action: &'static str) -> Result<(), TransitionError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(not_authorized(actor, action))
    }
}

fn require_owner(job: &Job, actor: &Actor, action: &'static str) -> Result<(), TransitionError> {
    if job.is_owned_by(&actor.id) {
        Ok(())
    } else {
        Err(not_authorized(actor, action))
    }
}

fn require_assigned_worker(
    job: &Job,
    actor: &Actor,
    action: &'static str,
) -> Result<(), TransitionError> {
    if actor.role == Role::Worker && job.is_assigned_to(&actor.id) {
        Ok(())
    } else {
        Err(not_authorized(actor, action))
    }
}

fn require_status(
    job: &Job,
    allowed: &[JobStatus],
    action: &'static str,
) -> Result<(), TransitionError> {
    if allowed.contains(&job.status) {
        Ok(())
    } else {
        Err(TransitionError::WrongState {
            action,
            status: job.status,
        })
    }
}

fn deadline_of(job: &Job, action: &'static str) -> Result<DateTime<Utc>, TransitionError> {
    job.dispute_deadline.ok_or(TransitionError::WrongState {
        action,
        status: job.status,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn assigned_worker(job: &Job) -> Vec<String> {
    job.worker_id.iter().cloned().collect()
}

fn release_worker(job: &mut Job, now: DateTime<Utc>) {
    job.worker_id = None;
    job.accepted_at = None;
    job.cancelled_at = Some(now);
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn apply_changes(job: &mut Job, changes: &UpdateJob) -> Result<(), TransitionError> {
    if let Some(title) = &changes.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(TransitionError::InvalidPayload(
                "title cannot be empty".to_string(),
            ));
        }
        job.title = title.to_string();
    }
    if let Some(price) = changes.price_cents {
        if price <= 0 {
            return Err(TransitionError::InvalidPayload(
                "price must be greater than 0".to_string(),
            ));
        }
        job.price_cents = price;
    }
    if let Some(description) = &changes.description {
        job.description = description.clone();
    }
    if let Some(location) = &changes.location {
        job.location = location.clone();
    }
    if let Some(image_url) = &changes.image_url {
        job.image_url = non_blank(Some(image_url));
    }
    Ok(())
}
