//! Domain events emitted by committed lifecycle transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{Job, JobStatus};

/// Something that happened to a job, addressed to the users who must see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Unique per event; notifications are idempotent on this id
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub kind: JobEventKind,
    pub status: JobStatus,
    pub recipients: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl JobEvent {
    /// Captures `job` as committed after the transition
    pub fn new(
        job: &Job,
        kind: JobEventKind,
        recipients: Vec<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job.id,
            job_title: job.title.clone(),
            kind,
            status: job.status,
            recipients,
            occurred_at,
        }
    }

    /// Human readable text shown in the recipient's inbox
    pub fn message(&self) -> String {
        let title = &self.job_title;
        match self.kind {
            JobEventKind::JobAccepted => format!("A worker accepted \"{title}\""),
            JobEventKind::JobCompleted => {
                format!("\"{title}\" was completed. Review it before the dispute window closes")
            }
            JobEventKind::JobCancelledByClient => format!("The client cancelled \"{title}\""),
            JobEventKind::JobCancelledByWorker => format!("The worker cancelled \"{title}\""),
            JobEventKind::JobReactivated => format!("\"{title}\" is open again"),
            JobEventKind::JobUpdated => format!("\"{title}\" was updated"),
            JobEventKind::DisputeOpened => format!("A dispute was opened for \"{title}\""),
            JobEventKind::JobRated => format!("\"{title}\" received a rating"),
            JobEventKind::CompletionConfirmed => {
                format!("The client confirmed completion of \"{title}\"")
            }
            JobEventKind::PaymentReleased => format!("Payment for \"{title}\" was released"),
            JobEventKind::HelpRequested => format!("Help was requested for \"{title}\""),
        }
    }
}

/// Typed event names, serialized in kebab-case (`job-accepted`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobEventKind {
    JobAccepted,
    JobCompleted,
    JobCancelledByClient,
    JobCancelledByWorker,
    JobReactivated,
    JobUpdated,
    DisputeOpened,
    JobRated,
    CompletionConfirmed,
    PaymentReleased,
    HelpRequested,
}

impl JobEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventKind::JobAccepted => "job-accepted",
            JobEventKind::JobCompleted => "job-completed",
            JobEventKind::JobCancelledByClient => "job-cancelled-by-client",
            JobEventKind::JobCancelledByWorker => "job-cancelled-by-worker",
            JobEventKind::JobReactivated => "job-reactivated",
            JobEventKind::JobUpdated => "job-updated",
            JobEventKind::DisputeOpened => "dispute-opened",
            JobEventKind::JobRated => "job-rated",
            JobEventKind::CompletionConfirmed => "completion-confirmed",
            JobEventKind::PaymentReleased => "payment-released",
            JobEventKind::HelpRequested => "help-requested",
        }
    }
}

impl std::fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job-accepted" => Ok(JobEventKind::JobAccepted),
            "job-completed" => Ok(JobEventKind::JobCompleted),
            "job-cancelled-by-client" => Ok(JobEventKind::JobCancelledByClient),
            "job-cancelled-by-worker" => Ok(JobEventKind::JobCancelledByWorker),
            "job-reactivated" => Ok(JobEventKind::JobReactivated),
            "job-updated" => Ok(JobEventKind::JobUpdated),
            "dispute-opened" => Ok(JobEventKind::DisputeOpened),
            "job-rated" => Ok(JobEventKind::JobRated),
            "completion-confirmed" => Ok(JobEventKind::CompletionConfirmed),
            "payment-released" => Ok(JobEventKind::PaymentReleased),
            "help-requested" => Ok(JobEventKind::HelpRequested),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}
