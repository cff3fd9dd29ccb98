//! Job Service
//!
//! Business logic for job creation, listings and lifecycle transitions.
//! Every transition is read, validated by the pure engine, committed with a
//! compare-and-swap and only then published.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use limpfy_core::domain::actor::{Actor, Role};
use limpfy_core::domain::job::{Job, JobStatus};
use limpfy_core::dto::job::{CreateJob, JobListing, JobQuery};
use limpfy_core::lifecycle::{self, Action, LifecyclePolicy, TransitionError};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::clock::Clock;
use super::notification::NotificationBus;
use super::payment::{PaymentInstruction, PaymentNotifier};
use crate::repository::{JobRepository, StoreError};

/// Service error type
#[derive(Debug, Error)]
pub enum JobError {
    /// The request was valid but the lifecycle refused it
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(StoreError),
}

impl JobError {
    /// The business rejection, if this is one
    pub fn transition(&self) -> Option<&TransitionError> {
        match self {
            JobError::Transition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => JobError::Transition(TransitionError::NotFound(id)),
            StoreError::Conflict { id } => {
                JobError::Transition(TransitionError::Conflict { job_id: id })
            }
            other => JobError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct JobService {
    jobs: Arc<dyn JobRepository>,
    notifications: Arc<NotificationBus>,
    payments: PaymentNotifier,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl JobService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        notifications: Arc<NotificationBus>,
        payments: PaymentNotifier,
        clock: Arc<dyn Clock>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            jobs,
            notifications,
            payments,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Publishes a new pending job owned by `actor`
    pub async fn create_job(&self, actor: &Actor, req: CreateJob) -> Result<Job, JobError> {
        if actor.role != Role::Client {
            return Err(TransitionError::NotAuthorized {
                action: "create",
                actor_id: actor.id.clone(),
                role: actor.role,
            }
            .into());
        }

        let title = req.title.trim();
        if title.is_empty() {
            return Err(JobError::Validation("title cannot be empty".to_string()));
        }
        if req.price_cents <= 0 {
            return Err(JobError::Validation(
                "price must be greater than 0".to_string(),
            ));
        }

        let mut job = Job::new(
            actor.id.clone(),
            title,
            req.description,
            req.location,
            req.price_cents,
            self.clock.now(),
        );
        job.image_url = req.image_url.filter(|url| !url.trim().is_empty());

        self.jobs.insert(&job).await?;
        self.payments.notify(PaymentInstruction::capture(&job));

        info!("Job created: {} by client {}", job.id, job.client_id);

        Ok(job)
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: Uuid) -> Result<Job, JobError> {
        let job = self
            .jobs
            .find_by_id(id)
            .await?
            .ok_or(TransitionError::NotFound(id))?;

        Ok(job)
    }

    /// Pending jobs any worker may accept, newest first
    pub async fn list_open_jobs(&self) -> Result<Vec<Job>, JobError> {
        Ok(self.jobs.find_by_status(JobStatus::Pending).await?)
    }

    /// Jobs the actor owns (client) or is assigned to (worker)
    pub async fn list_my_jobs(
        &self,
        actor: &Actor,
        query: &JobQuery,
    ) -> Result<JobListing, JobError> {
        let jobs = match actor.role {
            Role::Client => self.jobs.find_by_client(&actor.id).await?,
            Role::Worker => self.jobs.find_by_worker(&actor.id).await?,
            Role::System => {
                return Err(TransitionError::NotAuthorized {
                    action: "list",
                    actor_id: actor.id.clone(),
                    role: actor.role,
                }
                .into());
            }
        };

        Ok(query.apply(jobs))
    }

    /// Jobs whose dispute window has closed without a dispute
    pub async fn jobs_due_for_settlement(&self) -> Result<Vec<Job>, JobError> {
        Ok(self.jobs.find_due_for_settlement(self.clock.now()).await?)
    }

    /// Validates and commits `action` on job `id`
    ///
    /// Returns the job as stored after the commit. A concurrent writer that
    /// committed first yields `TransitionError::Conflict`; nothing is
    /// published for a rejected or lost transition.
    pub async fn apply_transition(
        &self,
        id: Uuid,
        actor: &Actor,
        action: Action,
    ) -> Result<Job, JobError> {
        let job = self.get_job(id).await?;
        let now = self.clock.now();

        let outcome = lifecycle::apply(&job, actor, &action, now, &self.policy).inspect_err(|e| {
            debug!(
                job_id = %id,
                actor = %actor.id,
                action = action.name(),
                "Transition rejected: {}",
                e
            );
        })?;

        let committed = if outcome.changed {
            let committed = self
                .jobs
                .compare_and_swap(job.id, job.status, job.version, &outcome.job)
                .await?;

            info!(
                job_id = %id,
                actor = %actor.id,
                action = action.name(),
                "Job {} -> {}",
                outcome.previous_status,
                committed.status
            );
            committed
        } else {
            job
        };

        let releases_payment = outcome.releases_payment();
        for event in outcome.events {
            self.notifications.deliver(event).await;
        }

        if releases_payment {
            if let Some(instruction) = PaymentInstruction::release(&committed) {
                self.payments.notify(instruction);
            }
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryJobRepository, MemoryNotificationRepository};
    use crate::service::clock::ManualClock;
    use crate::service::payment::LoggingPaymentGateway;
    use chrono::Duration;
    use limpfy_core::domain::job::Location;

    struct Harness {
        service: JobService,
        bus: Arc<NotificationBus>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let bus = Arc::new(NotificationBus::new(
            Arc::new(MemoryNotificationRepository::new()),
            16,
        ));
        let service = JobService::new(
            Arc::new(MemoryJobRepository::new()),
            bus.clone(),
            PaymentNotifier::spawn(Arc::new(LoggingPaymentGateway)),
            clock.clone(),
            LifecyclePolicy::default(),
        );
        Harness {
            service,
            bus,
            clock,
        }
    }

    fn create_request() -> CreateJob {
        CreateJob {
            title: "Two bedroom apartment".to_string(),
            description: "Windows included".to_string(),
            location: Location::default(),
            price_cents: 15_000,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_job_validates_input() {
        let h = harness();
        let client = Actor::client("client-1");

        let mut req = create_request();
        req.price_cents = 0;
        let err = h.service.create_job(&client, req).await.unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));

        let err = h
            .service
            .create_job(&Actor::worker("worker-a"), create_request())
            .await
            .unwrap_err();
        assert_eq!(err.transition().map(|e| e.kind()), Some("not-authorized"));

        let job = h.service.create_job(&client, create_request()).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(h.service.list_open_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transition_commits_and_notifies() {
        let h = harness();
        let job = h
            .service
            .create_job(&Actor::client("client-1"), create_request())
            .await
            .unwrap();

        let accepted = h
            .service
            .apply_transition(job.id, &Actor::worker("worker-a"), Action::Accept)
            .await
            .unwrap();

        assert_eq!(accepted.status, JobStatus::InProgress);
        assert_eq!(accepted.version, 1);
        assert_eq!(h.bus.unread_count("client-1").await.unwrap(), 1);
        assert_eq!(h.bus.unread_count("worker-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejection_publishes_nothing() {
        let h = harness();
        let job = h
            .service
            .create_job(&Actor::client("client-1"), create_request())
            .await
            .unwrap();

        let err = h
            .service
            .apply_transition(job.id, &Actor::client("client-1"), Action::Confirm)
            .await
            .unwrap_err();

        assert_eq!(err.transition().map(|e| e.kind()), Some("wrong-state"));
        assert!(h.bus.list("client-1").await.unwrap().is_empty());
        assert_eq!(h.service.get_job(job.id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let h = harness();
        let err = h
            .service
            .apply_transition(Uuid::new_v4(), &Actor::worker("worker-a"), Action::Accept)
            .await
            .unwrap_err();
        assert_eq!(err.transition().map(|e| e.kind()), Some("not-found"));
    }

    #[tokio::test]
    async fn test_settle_uses_injected_clock() {
        let h = harness();
        let client = Actor::client("client-1");
        let worker = Actor::worker("worker-a");
        let job = h.service.create_job(&client, create_request()).await.unwrap();

        h.service
            .apply_transition(job.id, &worker, Action::Accept)
            .await
            .unwrap();
        h.service
            .apply_transition(
                job.id,
                &worker,
                Action::Complete {
                    proof_of_completion: Some("proof.jpg".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(h.service.jobs_due_for_settlement().await.unwrap().is_empty());
        h.clock.advance(Duration::minutes(30));
        assert_eq!(h.service.jobs_due_for_settlement().await.unwrap().len(), 1);

        let paid = h
            .service
            .apply_transition(job.id, &Actor::system(), Action::Settle)
            .await
            .unwrap();
        assert_eq!(paid.status, JobStatus::PaidOut);
    }

    #[tokio::test]
    async fn test_list_my_jobs_by_role() {
        let h = harness();
        let client = Actor::client("client-1");
        let job = h.service.create_job(&client, create_request()).await.unwrap();
        h.service.create_job(&client, create_request()).await.unwrap();
        h.service
            .apply_transition(job.id, &Actor::worker("worker-a"), Action::Accept)
            .await
            .unwrap();

        let mine = h
            .service
            .list_my_jobs(&client, &JobQuery::default())
            .await
            .unwrap();
        assert_eq!(mine.total, 2);

        let assigned = h
            .service
            .list_my_jobs(&Actor::worker("worker-a"), &JobQuery::default())
            .await
            .unwrap();
        assert_eq!(assigned.jobs.len(), 1);
        assert_eq!(assigned.jobs[0].id, job.id);
    }

    #[tokio::test]
    async fn test_failed_inbox_write_is_retried_after_commit() {
        use crate::repository::memory::FlakyNotificationRepository;
        use crate::service::notification::RetryPolicy;
        use std::sync::atomic::Ordering;

        let repository = Arc::new(FlakyNotificationRepository::failing(1));
        let bus = Arc::new(
            NotificationBus::new(repository.clone(), 16).with_retry(RetryPolicy {
                attempts: 3,
                initial_backoff: std::time::Duration::from_millis(5),
                max_backoff: std::time::Duration::from_millis(20),
            }),
        );
        let service = JobService::new(
            Arc::new(MemoryJobRepository::new()),
            bus.clone(),
            PaymentNotifier::spawn(Arc::new(LoggingPaymentGateway)),
            Arc::new(ManualClock::new(Utc::now())),
            LifecyclePolicy::default(),
        );
        let client = Actor::client("client-1");
        let job = service.create_job(&client, create_request()).await.unwrap();

        let accepted = service
            .apply_transition(job.id, &Actor::worker("worker-a"), Action::Accept)
            .await
            .unwrap();
        assert_eq!(accepted.status, JobStatus::InProgress);

        let inbox = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                let inbox = bus.list("client-1").await.unwrap();
                if !inbox.is_empty() {
                    return inbox;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job-accepted was never stored");

        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].job_id, job.id);
        assert_eq!(repository.attempts.load(Ordering::SeqCst), 2);
    }
}
