//! Notification API Handlers
//!
//! Inbox endpoints for the calling actor plus a server-sent-events stream of
//! live notifications.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use limpfy_core::domain::notification::Notification;
use limpfy_core::dto::notification::{AffectedCount, UnreadCount};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use uuid::Uuid;

use super::AppState;
use super::auth::Authenticated;
use super::error::{ApiError, ApiResult};

/// GET /notifications
/// List the caller's inbox, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = state.notifications.list(&actor.id).await?;
    Ok(Json(notifications))
}

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Json<UnreadCount>> {
    let unread = state.notifications.unread_count(&actor.id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// GET /notifications/stream
/// Live notifications as server-sent events
///
/// Sessions that fall behind skip the missed entries; the inbox still has them.
pub async fn stream_notifications(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("Opening notification stream for {}", actor.id);

    let receiver = state.notifications.subscribe(&actor.id);
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(notification) => Event::default()
            .event(notification.kind.as_str())
            .id(notification.id.to_string())
            .json_data(&notification)
            .ok()
            .map(Ok),
        Err(e) => {
            tracing::debug!("Notification stream lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.notifications.mark_read(&actor.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Notification {} not found", id)))
    }
}

/// POST /notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Json<AffectedCount>> {
    let affected = state.notifications.mark_all_read(&actor.id).await?;
    Ok(Json(AffectedCount { affected }))
}

/// DELETE /notifications/{id}
pub async fn remove_notification(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.notifications.remove(&actor.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Notification {} not found", id)))
    }
}

/// DELETE /notifications
/// Empty the caller's inbox
pub async fn clear_notifications(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Json<AffectedCount>> {
    let affected = state.notifications.clear(&actor.id).await?;
    tracing::info!("Cleared {} notification(s) for {}", affected, actor.id);
    Ok(Json(AffectedCount { affected }))
}
