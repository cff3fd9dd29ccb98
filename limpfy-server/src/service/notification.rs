//! Notification bus
//!
//! Turns committed job events into per-recipient inbox entries and pushes
//! them to every live session of the recipient. Storage is idempotent on
//! `(event id, recipient)`, so republishing an event never duplicates it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use limpfy_core::domain::event::JobEvent;
use limpfy_core::domain::notification::Notification;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::repository::{NotificationRepository, StoreError, StoreResult};

/// Inbox writes that failed for some recipients of an event
#[derive(Debug, Error)]
#[error("event {event_id} not stored for {} recipient(s): {source}", .pending.len())]
pub struct PublishError {
    pub event_id: Uuid,
    /// Recipients still missing the notification
    pub pending: Vec<String>,
    /// Last storage failure
    pub source: StoreError,
}

/// Backoff for re-publishing events whose inbox writes failed
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

pub struct NotificationBus {
    repository: Arc<dyn NotificationRepository>,
    sessions: DashMap<String, broadcast::Sender<Notification>>,
    buffer: usize,
    retry: RetryPolicy,
}

impl NotificationBus {
    /// `buffer` bounds the live backlog of each recipient; a lagging session
    /// skips ahead but the inbox keeps everything.
    pub fn new(repository: Arc<dyn NotificationRepository>, buffer: usize) -> Self {
        Self {
            repository,
            sessions: DashMap::new(),
            buffer: buffer.max(1),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stores and delivers `event` to its recipients
    ///
    /// Returns how many new inbox entries were written. Every recipient is
    /// attempted; the ones whose write failed come back in [`PublishError`].
    /// Events without recipients are dropped.
    pub async fn publish(&self, event: &JobEvent) -> Result<usize, PublishError> {
        if event.recipients.is_empty() {
            debug!(event_id = %event.id, kind = %event.kind, "Event has no recipients");
            return Ok(0);
        }

        let mut stored = 0;
        let mut pending = Vec::new();
        let mut last_error = None;
        for (i, recipient) in event.recipients.iter().enumerate() {
            if event.recipients[..i].contains(recipient) {
                continue;
            }

            let notification = Notification::for_recipient(event, recipient);
            match self.repository.insert_if_absent(&notification).await {
                Ok(true) => {
                    stored += 1;
                    self.push_live(notification);
                }
                Ok(false) => {
                    debug!(
                        event_id = %event.id,
                        recipient = %recipient,
                        "Notification already stored"
                    );
                }
                Err(e) => {
                    pending.push(recipient.clone());
                    last_error = Some(e);
                }
            }
        }

        if let Some(source) = last_error {
            return Err(PublishError {
                event_id: event.id,
                pending,
                source,
            });
        }

        debug!(event_id = %event.id, kind = %event.kind, stored, "Event published");
        Ok(stored)
    }

    /// Publishes `event`, retrying failed recipients in the background
    ///
    /// Callers have already committed the transition, so a storage failure
    /// here never surfaces to them.
    pub async fn deliver(self: &Arc<Self>, event: JobEvent) {
        let err = match self.publish(&event).await {
            Ok(_) => return,
            Err(err) => err,
        };

        warn!(event_id = %event.id, job_id = %event.job_id, "Retrying event publish: {}", err);

        let bus = Arc::clone(self);
        let event = JobEvent {
            recipients: err.pending,
            ..event
        };
        tokio::spawn(async move { bus.retry_publish(event).await });
    }

    async fn retry_publish(&self, mut event: JobEvent) {
        let mut backoff = self.retry.initial_backoff;

        for attempt in 1..=self.retry.attempts {
            tokio::time::sleep(backoff).await;

            match self.publish(&event).await {
                Ok(stored) => {
                    info!(event_id = %event.id, attempt, stored, "Event published after retry");
                    return;
                }
                Err(err) => {
                    warn!(event_id = %event.id, attempt, "Event publish failed again: {}", err);
                    event.recipients = err.pending;
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                }
            }
        }

        error!(
            event_id = %event.id,
            job_id = %event.job_id,
            recipients = ?event.recipients,
            "Giving up on event after {} attempts",
            self.retry.attempts
        );
    }

    /// Opens a live session for `recipient_id`
    pub fn subscribe(&self, recipient_id: &str) -> broadcast::Receiver<Notification> {
        self.sessions
            .entry(recipient_id.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe()
    }

    /// Ends every live session so streaming responses can finish
    pub fn close_sessions(&self) {
        let open = self.sessions.len();
        self.sessions.clear();
        info!("Closed live notification sessions for {} recipient(s)", open);
    }

    pub async fn list(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        self.repository.list(recipient_id).await
    }

    pub async fn unread_count(&self, recipient_id: &str) -> StoreResult<u64> {
        self.repository.unread_count(recipient_id).await
    }

    pub async fn mark_read(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        self.repository.mark_read(recipient_id, id).await
    }

    pub async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<u64> {
        self.repository.mark_all_read(recipient_id).await
    }

    pub async fn remove(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        self.repository.remove(recipient_id, id).await
    }

    pub async fn clear(&self, recipient_id: &str) -> StoreResult<u64> {
        self.repository.clear(recipient_id).await
    }

    fn push_live(&self, notification: Notification) {
        let recipient = notification.recipient_id.clone();
        let delivered = match self.sessions.get(&recipient) {
            Some(sender) => sender.send(notification).is_ok(),
            None => return,
        };

        if !delivered {
            // Every session of this recipient has gone away.
            self.sessions
                .remove_if(&recipient, |_, sender| sender.receiver_count() == 0);
        }
    }
}
