//! Notification domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{JobEvent, JobEventKind};

/// An event persisted in one recipient's inbox
///
/// Keyed by `(id, recipient_id)` where `id` is the originating event id, so
/// publishing the same event twice stores it once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub job_id: Uuid,
    pub kind: JobEventKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Builds the inbox entry of `event` for `recipient_id`
    pub fn for_recipient(event: &JobEvent, recipient_id: &str) -> Self {
        Self {
            id: event.id,
            recipient_id: recipient_id.to_string(),
            job_id: event.job_id,
            kind: event.kind,
            message: event.message(),
            read: false,
            created_at: event.occurred_at,
        }
    }
}
