//! API Error Handling
//!
//! Unified error types and conversion for API responses. Every error body is
//! `{"error": message, "code": kind, "recovery": hint}` so clients can pick
//! the next legal action without parsing the message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use limpfy_core::lifecycle::{Recovery, TransitionError};

use crate::repository::StoreError;
use crate::service::JobError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Business rejection from the lifecycle
    Transition(TransitionError),
    NotFound(String),
    BadRequest(String),
    /// Missing or malformed identity headers
    Unauthorized(String),
    DatabaseError(StoreError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, Recovery) {
        match self {
            ApiError::Transition(e) => {
                let status = match e {
                    TransitionError::NotFound(_) => StatusCode::NOT_FOUND,
                    TransitionError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
                    TransitionError::Conflict { .. } => StatusCode::CONFLICT,
                    TransitionError::WrongState { .. }
                    | TransitionError::AlreadyRated
                    | TransitionError::DeadlinePassed { .. }
                    | TransitionError::DeadlineNotReached { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    TransitionError::MissingPayload(_) | TransitionError::InvalidPayload(_) => {
                        StatusCode::BAD_REQUEST
                    }
                };
                (status, e.kind(), e.recovery())
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not-found", Recovery::None),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid-payload", Recovery::None),
            ApiError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", Recovery::None)
            }
            ApiError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", Recovery::None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, recovery) = self.parts();

        let message = match self {
            ApiError::Transition(e) => e.to_string(),
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => {
                msg
            }
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                "Internal server error".to_string()
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": code,
                "recovery": recovery,
            })),
        )
            .into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Transition(e) => ApiError::Transition(e),
            JobError::Validation(msg) => ApiError::BadRequest(msg),
            JobError::Store(e) => ApiError::DatabaseError(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::DatabaseError(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
