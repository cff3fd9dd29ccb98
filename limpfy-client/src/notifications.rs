//! Notification inbox endpoints

use limpfy_core::domain::notification::Notification;
use limpfy_core::dto::notification::{AffectedCount, UnreadCount};
use uuid::Uuid;

use crate::MarketplaceClient;
use crate::error::Result;

impl MarketplaceClient {
    /// The current actor's inbox, newest first
    pub async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let request = self.client.get(self.url("/notifications"));
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    pub async fn unread_count(&self) -> Result<u64> {
        let request = self.client.get(self.url("/notifications/unread-count"));
        let response = self.authorize(request).send().await?;

        let count: UnreadCount = self.handle_response(response).await?;
        Ok(count.unread)
    }

    pub async fn mark_read(&self, notification_id: Uuid) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/notifications/{}/read", notification_id)));
        let response = self.authorize(request).send().await?;

        self.handle_empty_response(response).await
    }

    /// Returns how many notifications changed
    pub async fn mark_all_read(&self) -> Result<u64> {
        let request = self.client.post(self.url("/notifications/read-all"));
        let response = self.authorize(request).send().await?;

        let affected: AffectedCount = self.handle_response(response).await?;
        Ok(affected.affected)
    }

    pub async fn remove_notification(&self, notification_id: Uuid) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/notifications/{}", notification_id)));
        let response = self.authorize(request).send().await?;

        self.handle_empty_response(response).await
    }

    /// Empties the inbox and returns how many entries were removed
    pub async fn clear_notifications(&self) -> Result<u64> {
        let request = self.client.delete(self.url("/notifications"));
        let response = self.authorize(request).send().await?;

        let affected: AffectedCount = self.handle_response(response).await?;
        Ok(affected.affected)
    }
}
