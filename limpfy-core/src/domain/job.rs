//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cleaning job record
///
/// Single source of truth for a job. Every mutation is committed through a
/// compare-and-swap on `status` and `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub client_id: String,
    pub worker_id: Option<String>,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub image_url: Option<String>,
    pub price_cents: i64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dispute_deadline: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
    pub paid_out_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub proof_of_completion: Option<String>,
    pub rating: Option<Rating>,
    pub version: i64,
}

impl Job {
    /// Creates a new pending job owned by `client_id`
    pub fn new(
        client_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        location: Location,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            worker_id: None,
            title: title.into(),
            description: description.into(),
            location,
            image_url: None,
            price_cents,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            completed_at: None,
            dispute_deadline: None,
            disputed_at: None,
            dispute_reason: None,
            paid_out_at: None,
            cancelled_at: None,
            proof_of_completion: None,
            rating: None,
            version: 0,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.client_id == user_id
    }

    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.worker_id.as_deref() == Some(user_id)
    }

    /// Whether the dispute window is still open at `now`
    pub fn dispute_window_open(&self, now: DateTime<Utc>) -> bool {
        self.dispute_deadline.is_some_and(|deadline| now < deadline)
    }

    /// A worker is assigned exactly when the status requires one
    pub fn assignment_consistent(&self) -> bool {
        self.worker_id.is_some() == self.status.requires_worker()
    }
}

/// Lifecycle status of a job
///
/// Completion and the rating wait are one dispute-window phase,
/// `WaitingForRating`; the legacy `completed` spelling parses to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    InProgress,
    #[serde(alias = "completed")]
    WaitingForRating,
    PaidOut,
    CancelledByClient,
    CancelledByWorker,
    Dispute,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::WaitingForRating,
        JobStatus::PaidOut,
        JobStatus::CancelledByClient,
        JobStatus::CancelledByWorker,
        JobStatus::Dispute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in-progress",
            JobStatus::WaitingForRating => "waiting-for-rating",
            JobStatus::PaidOut => "paid-out",
            JobStatus::CancelledByClient => "cancelled-by-client",
            JobStatus::CancelledByWorker => "cancelled-by-worker",
            JobStatus::Dispute => "dispute",
        }
    }

    /// Every spelling that parses to this status, canonical first
    ///
    /// Stores must match on all of them so rows written with a legacy
    /// spelling stay reachable.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            JobStatus::Pending => &["pending"],
            JobStatus::InProgress => &["in-progress"],
            JobStatus::WaitingForRating => &["waiting-for-rating", "completed"],
            JobStatus::PaidOut => &["paid-out"],
            JobStatus::CancelledByClient => &["cancelled-by-client"],
            JobStatus::CancelledByWorker => &["cancelled-by-worker"],
            JobStatus::Dispute => &["dispute"],
        }
    }

    /// Statuses in which `worker_id` must be set
    pub fn requires_worker(&self) -> bool {
        matches!(
            self,
            JobStatus::InProgress
                | JobStatus::WaitingForRating
                | JobStatus::Dispute
                | JobStatus::PaidOut
        )
    }

    /// No lifecycle action leaves these statuses.
    ///
    /// `CancelledByClient` is absent: the owner may reactivate it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::PaidOut | JobStatus::CancelledByWorker | JobStatus::Dispute
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.spellings().contains(&s))
            .ok_or_else(|| format!("unknown job status: {s}"))
    }
}

/// Service address of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub cep: String,
    pub street: String,
    pub city: String,
    pub state: String,
}

/// Client rating of a finished job, written once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub score: u8,
    pub comment: Option<String>,
    pub rated_at: DateTime<Utc>,
}
