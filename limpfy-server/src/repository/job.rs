//! Job Repository
//!
//! PostgreSQL storage for job records. The compare-and-swap is a single
//! conditional `UPDATE ... RETURNING`, so the status/version check and the
//! write are one atomic statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use limpfy_core::domain::job::{Job, JobStatus, Location, Rating};
use sqlx::PgPool;
use uuid::Uuid;

use super::{JobRepository, StoreError, StoreResult};

const JOB_COLUMNS: &str = r#"
    id, client_id, worker_id, title, description, location, image_url,
    price_cents, status, created_at, updated_at, accepted_at, completed_at,
    dispute_deadline, disputed_at, dispute_reason, paid_out_at, cancelled_at,
    proof_of_completion, rating, version
"#;

/// PostgreSQL implementation of [`JobRepository`]
#[derive(Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, value: &str) -> StoreResult<Vec<Job>> {
        let sql =
            format!("SELECT {JOB_COLUMNS} FROM jobs WHERE {clause} ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, client_id, worker_id, title, description, location,
                              image_url, price_cents, status, created_at, updated_at,
                              accepted_at, completed_at, dispute_deadline, disputed_at,
                              dispute_reason, paid_out_at, cancelled_at,
                              proof_of_completion, rating, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(job.id)
        .bind(&job.client_id)
        .bind(&job.worker_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(location_to_json(job)?)
        .bind(&job.image_url)
        .bind(job.price_cents)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.accepted_at)
        .bind(job.completed_at)
        .bind(job.dispute_deadline)
        .bind(job.disputed_at)
        .bind(&job.dispute_reason)
        .bind(job.paid_out_at)
        .bind(job.cancelled_at)
        .bind(&job.proof_of_completion)
        .bind(rating_to_json(job)?)
        .bind(job.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from).transpose()
    }

    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected_status: JobStatus,
        expected_version: i64,
        next: &Job,
    ) -> StoreResult<Job> {
        let sql = format!(
            r#"
            UPDATE jobs
            SET worker_id = $4, title = $5, description = $6, location = $7,
                image_url = $8, price_cents = $9, status = $10, updated_at = $11,
                accepted_at = $12, completed_at = $13, dispute_deadline = $14,
                disputed_at = $15, dispute_reason = $16, paid_out_at = $17,
                cancelled_at = $18, proof_of_completion = $19, rating = $20,
                version = version + 1
            WHERE id = $1 AND status = ANY($2) AND version = $3
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .bind(spellings(expected_status))
            .bind(expected_version)
            .bind(&next.worker_id)
            .bind(&next.title)
            .bind(&next.description)
            .bind(location_to_json(next)?)
            .bind(&next.image_url)
            .bind(next.price_cents)
            .bind(next.status.as_str())
            .bind(next.updated_at)
            .bind(next.accepted_at)
            .bind(next.completed_at)
            .bind(next.dispute_deadline)
            .bind(next.disputed_at)
            .bind(&next.dispute_reason)
            .bind(next.paid_out_at)
            .bind(next.cancelled_at)
            .bind(&next.proof_of_completion)
            .bind(rating_to_json(next)?)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => {
                // Nothing matched: tell a lost race apart from a deleted row.
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;

                if exists {
                    Err(StoreError::Conflict { id })
                } else {
                    Err(StoreError::NotFound(id))
                }
            }
        }
    }

    async fn find_by_client(&self, client_id: &str) -> StoreResult<Vec<Job>> {
        self.fetch_where("client_id = $1", client_id).await
    }

    async fn find_by_worker(&self, worker_id: &str) -> StoreResult<Vec<Job>> {
        self.fetch_where("worker_id = $1", worker_id).await
    }

    async fn find_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = ANY($1) ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(spellings(status))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn find_due_for_settlement(&self, now: DateTime<Utc>) -> StoreResult<Vec<Job>> {
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE status = ANY($1) AND dispute_deadline <= $2
            ORDER BY dispute_deadline ASC
            "#
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(spellings(JobStatus::WaitingForRating))
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Job::try_from).collect()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Status filter matching legacy spellings as well as the canonical one
fn spellings(status: JobStatus) -> Vec<String> {
    status.spellings().iter().map(|s| s.to_string()).collect()
}

fn location_to_json(job: &Job) -> StoreResult<serde_json::Value> {
    serde_json::to_value(&job.location).map_err(|e| StoreError::Corrupt {
        id: job.id,
        reason: format!("location: {e}"),
    })
}

fn rating_to_json(job: &Job) -> StoreResult<Option<serde_json::Value>> {
    job.rating
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::Corrupt {
            id: job.id,
            reason: format!("rating: {e}"),
        })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    client_id: String,
    worker_id: Option<String>,
    title: String,
    description: String,
    location: serde_json::Value,
    image_url: Option<String>,
    price_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    dispute_deadline: Option<DateTime<Utc>>,
    disputed_at: Option<DateTime<Utc>>,
    dispute_reason: Option<String>,
    paid_out_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    proof_of_completion: Option<String>,
    rating: Option<serde_json::Value>,
    version: i64,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |reason: String| StoreError::Corrupt { id, reason };

        let status = row.status.parse::<JobStatus>().map_err(corrupt)?;
        let location: Location = serde_json::from_value(row.location)
            .map_err(|e| corrupt(format!("location: {e}")))?;
        let rating: Option<Rating> = row
            .rating
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| corrupt(format!("rating: {e}")))?;

        Ok(Job {
            id,
            client_id: row.client_id,
            worker_id: row.worker_id,
            title: row.title,
            description: row.description,
            location,
            image_url: row.image_url,
            price_cents: row.price_cents,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            accepted_at: row.accepted_at,
            completed_at: row.completed_at,
            dispute_deadline: row.dispute_deadline,
            disputed_at: row.disputed_at,
            dispute_reason: row.dispute_reason,
            paid_out_at: row.paid_out_at,
            cancelled_at: row.cancelled_at,
            proof_of_completion: row.proof_of_completion,
            rating,
            version: row.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with_status(status: &str) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: Uuid::new_v4(),
            client_id: "client-1".to_string(),
            worker_id: Some("worker-a".to_string()),
            title: "Loft".to_string(),
            description: String::new(),
            location: serde_json::json!({"cep": "", "street": "", "city": "", "state": ""}),
            image_url: None,
            price_cents: 8_000,
            status: status.to_string(),
            created_at: now,
            updated_at: now,
            accepted_at: Some(now),
            completed_at: Some(now),
            dispute_deadline: Some(now),
            disputed_at: None,
            dispute_reason: None,
            paid_out_at: None,
            cancelled_at: None,
            proof_of_completion: Some("uploads/loft.jpg".to_string()),
            rating: None,
            version: 2,
        }
    }

    #[test]
    fn test_settlement_filter_covers_legacy_rows() {
        let job = Job::try_from(row_with_status("completed")).unwrap();
        assert_eq!(job.status, JobStatus::WaitingForRating);

        // The CAS and the sweep query bind this list, so the stored spelling matches.
        let filter = spellings(job.status);
        assert!(filter.contains(&"completed".to_string()));
        assert!(filter.contains(&"waiting-for-rating".to_string()));
        assert_eq!(spellings(JobStatus::Dispute), vec!["dispute".to_string()]);
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let err = Job::try_from(row_with_status("archived")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
