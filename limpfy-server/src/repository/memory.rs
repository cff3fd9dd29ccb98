//! In-memory repositories
//!
//! DashMap-backed stores used when no `DATABASE_URL` is configured and by the
//! test suites. The compare-and-swap runs under the per-key shard lock held by
//! `get_mut`, which gives it the same atomicity as the conditional `UPDATE`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use limpfy_core::domain::job::{Job, JobStatus};
use limpfy_core::domain::notification::Notification;
use uuid::Uuid;

use super::{JobRepository, NotificationRepository, StoreError, StoreResult};

/// In-memory implementation of [`JobRepository`]
#[derive(Clone, Default)]
pub struct MemoryJobRepository {
    jobs: Arc<DashMap<Uuid, Job>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<P>(&self, predicate: P) -> Vec<Job>
    where
        P: Fn(&Job) -> bool,
    {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected_status: JobStatus,
        expected_version: i64,
        next: &Job,
    ) -> StoreResult<Job> {
        let mut entry = self.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if entry.status != expected_status || entry.version != expected_version {
            return Err(StoreError::Conflict { id });
        }

        let mut stored = next.clone();
        stored.id = id;
        stored.version = expected_version + 1;
        *entry = stored.clone();

        Ok(stored)
    }

    async fn find_by_client(&self, client_id: &str) -> StoreResult<Vec<Job>> {
        Ok(self.collect(|job| job.client_id == client_id))
    }

    async fn find_by_worker(&self, worker_id: &str) -> StoreResult<Vec<Job>> {
        Ok(self.collect(|job| job.is_assigned_to(worker_id)))
    }

    async fn find_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        Ok(self.collect(|job| job.status == status))
    }

    async fn find_due_for_settlement(&self, now: DateTime<Utc>) -> StoreResult<Vec<Job>> {
        let mut due = self.collect(|job| {
            job.status == JobStatus::WaitingForRating
                && job.dispute_deadline.is_some_and(|deadline| deadline <= now)
        });
        due.sort_by_key(|job| job.dispute_deadline);
        Ok(due)
    }
}

/// In-memory implementation of [`NotificationRepository`]
#[derive(Clone, Default)]
pub struct MemoryNotificationRepository {
    inboxes: Arc<DashMap<String, Vec<Notification>>>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert_if_absent(&self, notification: &Notification) -> StoreResult<bool> {
        let mut inbox = self
            .inboxes
            .entry(notification.recipient_id.clone())
            .or_default();

        if inbox.iter().any(|n| n.id == notification.id) {
            return Ok(false);
        }
        inbox.push(notification.clone());
        Ok(true)
    }

    async fn list(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        let mut notifications = self
            .inboxes
            .get(recipient_id)
            .map(|inbox| inbox.clone())
            .unwrap_or_default();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn unread_count(&self, recipient_id: &str) -> StoreResult<u64> {
        Ok(self
            .inboxes
            .get(recipient_id)
            .map(|inbox| inbox.iter().filter(|n| !n.read).count() as u64)
            .unwrap_or(0))
    }

    async fn mark_read(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        let Some(mut inbox) = self.inboxes.get_mut(recipient_id) else {
            return Ok(false);
        };
        match inbox.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<u64> {
        let Some(mut inbox) = self.inboxes.get_mut(recipient_id) else {
            return Ok(0);
        };
        let mut affected = 0;
        for notification in inbox.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn remove(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        let Some(mut inbox) = self.inboxes.get_mut(recipient_id) else {
            return Ok(false);
        };
        let before = inbox.len();
        inbox.retain(|n| n.id != id);
        Ok(inbox.len() < before)
    }

    async fn clear(&self, recipient_id: &str) -> StoreResult<u64> {
        Ok(self
            .inboxes
            .remove(recipient_id)
            .map(|(_, inbox)| inbox.len() as u64)
            .unwrap_or(0))
    }
}

/// Notification store whose first `failures` inserts fail
#[cfg(test)]
pub(crate) struct FlakyNotificationRepository {
    inner: MemoryNotificationRepository,
    failures: std::sync::atomic::AtomicUsize,
    pub(crate) attempts: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FlakyNotificationRepository {
    pub(crate) fn failing(failures: usize) -> Self {
        Self {
            inner: MemoryNotificationRepository::new(),
            failures: std::sync::atomic::AtomicUsize::new(failures),
            attempts: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl NotificationRepository for FlakyNotificationRepository {
    async fn insert_if_absent(&self, notification: &Notification) -> StoreResult<bool> {
        use std::sync::atomic::Ordering;

        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.insert_if_absent(notification).await
    }

    async fn list(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        self.inner.list(recipient_id).await
    }

    async fn unread_count(&self, recipient_id: &str) -> StoreResult<u64> {
        self.inner.unread_count(recipient_id).await
    }

    async fn mark_read(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        self.inner.mark_read(recipient_id, id).await
    }

    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<u64> {
        self.inner.mark_all_read(recipient_id).await
    }

    async fn remove(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        self.inner.remove(recipient_id, id).await
    }

    async fn clear(&self, recipient_id: &str) -> StoreResult<u64> {
        self.inner.clear(recipient_id).await
    }
}
