//! API Module
//!
//! HTTP API layer for the marketplace.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod error;
pub mod extract;
pub mod health;
pub mod job;
pub mod notification;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::{JobService, NotificationBus};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobService,
    pub notifications: Arc<NotificationBus>,
}

impl AppState {
    pub fn new(jobs: JobService, notifications: Arc<NotificationBus>) -> Self {
        Self {
            jobs,
            notifications,
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::create_job))
        .route("/jobs/open", get(job::list_open_jobs))
        .route("/jobs/mine", get(job::list_my_jobs))
        .route("/jobs/{id}", get(job::get_job).put(job::update_job))
        .route("/jobs/{id}/accept", post(job::accept_job))
        .route("/jobs/{id}/complete", post(job::complete_job))
        .route("/jobs/{id}/cancel", post(job::cancel_job))
        .route("/jobs/{id}/reactivate", post(job::reactivate_job))
        .route("/jobs/{id}/dispute", post(job::open_dispute))
        .route("/jobs/{id}/rate", post(job::rate_job))
        .route("/jobs/{id}/confirm", post(job::confirm_job))
        .route("/jobs/{id}/help", post(job::request_help))
        // Notification endpoints
        .route(
            "/notifications",
            get(notification::list_notifications).delete(notification::clear_notifications),
        )
        .route(
            "/notifications/unread-count",
            get(notification::unread_count),
        )
        .route("/notifications/stream", get(notification::stream_notifications))
        .route("/notifications/read-all", post(notification::mark_all_read))
        .route("/notifications/{id}/read", post(notification::mark_read))
        .route("/notifications/{id}", delete(notification::remove_notification))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
