//! Notification Repository
//!
//! PostgreSQL storage for per-recipient inboxes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use limpfy_core::domain::event::JobEventKind;
use limpfy_core::domain::notification::Notification;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NotificationRepository, StoreError, StoreResult};

/// PostgreSQL implementation of [`NotificationRepository`]
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert_if_absent(&self, notification: &Notification) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, job_id, kind, message, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id, recipient_id) DO NOTHING
            "#,
        )
        .bind(notification.id)
        .bind(&notification.recipient_id)
        .bind(notification.job_id)
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, job_id, kind, message, read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn unread_count(&self, recipient_id: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn mark_read(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND id = $2")
                .bind(recipient_id)
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn remove(&self, recipient_id: &str, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1 AND id = $2")
            .bind(recipient_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, recipient_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1")
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: String,
    job_id: Uuid,
    kind: String,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<JobEventKind>()
            .map_err(|reason| StoreError::Corrupt { id: row.id, reason })?;

        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            job_id: row.job_id,
            kind,
            message: row.message,
            read: row.read,
            created_at: row.created_at,
        })
    }
}
