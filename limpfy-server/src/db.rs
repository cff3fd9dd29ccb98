use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            client_id VARCHAR(255) NOT NULL,
            worker_id VARCHAR(255),
            title VARCHAR(255) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            location JSONB NOT NULL DEFAULT '{}',
            image_url TEXT,
            price_cents BIGINT NOT NULL,
            status VARCHAR(50) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            accepted_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            dispute_deadline TIMESTAMPTZ,
            disputed_at TIMESTAMPTZ,
            dispute_reason TEXT,
            paid_out_at TIMESTAMPTZ,
            cancelled_at TIMESTAMPTZ,
            proof_of_completion TEXT,
            rating JSONB,
            version BIGINT NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Rows written before completion and the rating wait were merged
    sqlx::query("UPDATE jobs SET status = 'waiting-for-rating' WHERE status = 'completed'")
        .execute(pool)
        .await?;

    // Create notifications table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id UUID NOT NULL,
            recipient_id VARCHAR(255) NOT NULL,
            job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            kind VARCHAR(50) NOT NULL,
            message TEXT NOT NULL,
            read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (id, recipient_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the listing and sweep queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_client_id ON jobs(client_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_worker_id ON jobs(worker_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_settlement ON jobs(status, dispute_deadline)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
