//! Job API Handlers
//!
//! HTTP endpoints for job creation, listings and lifecycle transitions.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use limpfy_core::domain::actor::Actor;
use limpfy_core::domain::job::Job;
use limpfy_core::dto::job::{
    CompleteJob, CreateJob, JobListing, JobQuery, OpenDispute, RateJob, RequestHelp, UpdateJob,
};
use limpfy_core::lifecycle::Action;
use uuid::Uuid;

use super::AppState;
use super::auth::Authenticated;
use super::error::ApiResult;
use super::extract::ApiJson;

// =============================================================================
// Job Endpoints
// =============================================================================

/// POST /jobs
/// Publish a new cleaning job
pub async fn create_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    ApiJson(req): ApiJson<CreateJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    tracing::info!("Client {} creating job '{}'", actor.id, req.title);

    let job = state.jobs.create_job(&actor, req).await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs/open
/// List pending jobs available to workers
pub async fn list_open_jobs(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing open jobs");

    let jobs = state.jobs.list_open_jobs().await?;

    Ok(Json(jobs))
}

/// GET /jobs/mine
/// List the caller's jobs
///
/// Query parameters:
/// - `status` (optional): only jobs in this status
/// - `search` (optional): case-insensitive title substring
/// - `sort` (optional): `created-desc` (default), `created-asc`, `price-asc`, `price-desc`
pub async fn list_my_jobs(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(query): Query<JobQuery>,
) -> ApiResult<Json<JobListing>> {
    tracing::debug!("Listing jobs for {} {}", actor.role, actor.id);

    let listing = state.jobs.list_my_jobs(&actor, &query).await?;

    Ok(Json(listing))
}

/// GET /jobs/{id}
/// Get job details by ID
pub async fn get_job(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = state.jobs.get_job(id).await?;

    Ok(Json(job))
}

// =============================================================================
// Lifecycle Endpoints
// =============================================================================

/// PUT /jobs/{id}
/// Edit a job that is still pending
pub async fn update_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateJob>,
) -> ApiResult<Json<Job>> {
    transition(&state, &actor, id, Action::Edit(req)).await
}

/// POST /jobs/{id}/accept
pub async fn accept_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    transition(&state, &actor, id, Action::Accept).await
}

/// POST /jobs/{id}/complete
/// Hand in the job with a proof of completion
pub async fn complete_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<CompleteJob>,
) -> ApiResult<Json<Job>> {
    let action = Action::Complete {
        proof_of_completion: req.proof_of_completion,
    };
    transition(&state, &actor, id, action).await
}

/// POST /jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    transition(&state, &actor, id, Action::Cancel).await
}

/// POST /jobs/{id}/reactivate
pub async fn reactivate_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    transition(&state, &actor, id, Action::Reactivate).await
}

/// POST /jobs/{id}/dispute
pub async fn open_dispute(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<OpenDispute>,
) -> ApiResult<Json<Job>> {
    transition(&state, &actor, id, Action::OpenDispute { reason: req.reason }).await
}

/// POST /jobs/{id}/rate
pub async fn rate_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<RateJob>,
) -> ApiResult<Json<Job>> {
    let action = Action::Rate {
        score: req.score,
        comment: req.comment,
    };
    transition(&state, &actor, id, action).await
}

/// POST /jobs/{id}/confirm
/// Accept the completed work and release payment early
pub async fn confirm_job(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    transition(&state, &actor, id, Action::Confirm).await
}

/// POST /jobs/{id}/help
/// Contact support once the dispute window is closed
pub async fn request_help(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<RequestHelp>,
) -> ApiResult<Json<Job>> {
    if let Some(message) = &req.message {
        tracing::info!(job_id = %id, client = %actor.id, "Help requested: {}", message);
    }

    transition(&state, &actor, id, Action::RequestHelp { message: req.message }).await
}

async fn transition(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    action: Action,
) -> ApiResult<Json<Job>> {
    tracing::info!("{} {} requests {} on job {}", actor.role, actor.id, action.name(), id);

    let job = state.jobs.apply_transition(id, actor, action).await?;

    Ok(Json(job))
}
