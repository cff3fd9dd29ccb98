//! Repository Module
//!
//! Data access layer for the server. Each repository is a trait with a
//! PostgreSQL implementation and an in-memory one used when no database is
//! configured and throughout the tests.

pub mod job;
pub mod memory;
pub mod notification;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use limpfy_core::domain::job::{Job, JobStatus};
use limpfy_core::domain::notification::Notification;
use thiserror::Error;
use uuid::Uuid;

pub use job::PgJobRepository;
pub use memory::{MemoryJobRepository, MemoryNotificationRepository};
pub use notification::PgNotificationRepository;

/// Storage error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(Uuid),

    /// The stored status or version no longer matches what the caller read
    #[error("record {id} was modified concurrently")]
    Conflict { id: Uuid },

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Job record store
///
/// All mutations after creation go through [`JobRepository::compare_and_swap`].
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Stores a freshly created job
    async fn insert(&self, job: &Job) -> StoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Replaces the job only if it is still in `expected_status` at
    /// `expected_version`
    ///
    /// The stored copy gets `expected_version + 1` and is returned.
    ///
    /// # Errors
    /// * `StoreError::Conflict` - another write committed first
    /// * `StoreError::NotFound` - the job no longer exists
    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected_status: JobStatus,
        expected_version: i64,
        next: &Job,
    ) -> StoreResult<Job>;

    async fn find_by_client(&self, client_id: &str) -> StoreResult<Vec<Job>>;

    async fn find_by_worker(&self, worker_id: &str) -> StoreResult<Vec<Job>>;

    async fn find_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>>;

    /// Jobs waiting for rating whose dispute deadline is at or before `now`
    async fn find_due_for_settlement(&self, now: DateTime<Utc>) -> StoreResult<Vec<Job>>;
}

/// Per-recipient notification inbox
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Stores the notification unless `(id, recipient_id)` already exists
    ///
    /// Returns whether a new row was written.
    async fn insert_if_absent(&self, notification: &Notification) -> StoreResult<bool>;

    /// Newest first
    async fn list(&self, recipient_id: &str) -> StoreResult<Vec<Notification>>;

    async fn unread_count(&self, recipient_id: &str) -> StoreResult<u64>;

    async fn mark_read(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool>;

    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<u64>;

    async fn remove(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool>;

    async fn clear(&self, recipient_id: &str) -> StoreResult<u64>;
}
