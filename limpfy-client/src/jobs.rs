//! Job-related API endpoints

use limpfy_core::domain::job::Job;
use limpfy_core::dto::job::{
    CompleteJob, CreateJob, JobListing, JobQuery, OpenDispute, RateJob, RequestHelp, UpdateJob,
};
use uuid::Uuid;

use crate::MarketplaceClient;
use crate::error::Result;

impl MarketplaceClient {
    // =============================================================================
    // Listings
    // =============================================================================

    /// Publish a new job as the current client
    pub async fn create_job(&self, req: CreateJob) -> Result<Job> {
        let request = self.client.post(self.url("/jobs")).json(&req);
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let request = self.client.get(self.url(&format!("/jobs/{}", job_id)));
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    /// Pending jobs open to workers
    pub async fn list_open_jobs(&self) -> Result<Vec<Job>> {
        let request = self.client.get(self.url("/jobs/open"));
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    /// The current actor's jobs, filtered and sorted by `query`
    pub async fn list_my_jobs(&self, query: &JobQuery) -> Result<JobListing> {
        let mut params: Vec<(&str, String)> = vec![("sort", enum_param(&query.sort)?)];
        if let Some(status) = query.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let request = self.client.get(self.url("/jobs/mine")).query(&params);
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Lifecycle
    // =============================================================================

    /// Edit a pending job
    pub async fn update_job(&self, job_id: Uuid, req: UpdateJob) -> Result<Job> {
        let request = self
            .client
            .put(self.url(&format!("/jobs/{}", job_id)))
            .json(&req);
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }

    /// Accept a pending job as the current worker
    ///
    /// Losing the race to another worker yields an error for which
    /// [`ClientError::is_conflict`](crate::ClientError::is_conflict) is true.
    pub async fn accept_job(&self, job_id: Uuid) -> Result<Job> {
        self.post_action(job_id, "accept", None::<&()>).await
    }

    pub async fn complete_job(
        &self,
        job_id: Uuid,
        proof_of_completion: impl Into<String>,
    ) -> Result<Job> {
        let body = CompleteJob {
            proof_of_completion: Some(proof_of_completion.into()),
        };
        self.post_action(job_id, "complete", Some(&body)).await
    }

    pub async fn cancel_job(&self, job_id: Uuid) -> Result<Job> {
        self.post_action(job_id, "cancel", None::<&()>).await
    }

    pub async fn reactivate_job(&self, job_id: Uuid) -> Result<Job> {
        self.post_action(job_id, "reactivate", None::<&()>).await
    }

    pub async fn open_dispute(&self, job_id: Uuid, reason: Option<String>) -> Result<Job> {
        self.post_action(job_id, "dispute", Some(&OpenDispute { reason }))
            .await
    }

    pub async fn rate_job(&self, job_id: Uuid, score: u8, comment: Option<String>) -> Result<Job> {
        self.post_action(job_id, "rate", Some(&RateJob { score, comment }))
            .await
    }

    /// Confirm the completion and release payment before the window closes
    pub async fn confirm_job(&self, job_id: Uuid) -> Result<Job> {
        self.post_action(job_id, "confirm", None::<&()>).await
    }

    pub async fn request_help(&self, job_id: Uuid, message: Option<String>) -> Result<Job> {
        self.post_action(job_id, "help", Some(&RequestHelp { message }))
            .await
    }

    async fn post_action<B: serde::Serialize>(
        &self,
        job_id: Uuid,
        action: &str,
        body: Option<&B>,
    ) -> Result<Job> {
        let mut request = self
            .client
            .post(self.url(&format!("/jobs/{}/{}", job_id, action)));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.authorize(request).send().await?;

        self.handle_response(response).await
    }
}

/// Wire name of a unit enum value
fn enum_param<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(crate::ClientError::ParseError(format!(
            "expected a string parameter, got {}",
            other
        ))),
        Err(e) => Err(crate::ClientError::ParseError(e.to_string())),
    }
}
