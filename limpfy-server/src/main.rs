use std::sync::Arc;

use anyhow::Context;
use limpfy_server::api::{self, AppState};
use limpfy_server::config::Config;
use limpfy_server::db;
use limpfy_server::repository::{
    JobRepository, MemoryJobRepository, MemoryNotificationRepository, NotificationRepository,
    PgJobRepository, PgNotificationRepository,
};
use limpfy_server::scheduler::SettlementSweeper;
use limpfy_server::service::{
    JobService, LoggingPaymentGateway, NotificationBus, PaymentNotifier, SystemClock,
};
use limpfy_server::shutdown;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "limpfy_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Limpfy server...");

    let config = Config::from_env().context("Invalid configuration")?;

    let (jobs, notifications): (Arc<dyn JobRepository>, Arc<dyn NotificationRepository>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!("Connecting to database...");

                let pool = db::create_pool(database_url)
                    .await
                    .context("Failed to create database pool")?;

                tracing::info!("Database connection pool created");

                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;

                (
                    Arc::new(PgJobRepository::new(pool.clone())),
                    Arc::new(PgNotificationRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using the in-memory store");
                (
                    Arc::new(MemoryJobRepository::new()),
                    Arc::new(MemoryNotificationRepository::new()),
                )
            }
        };

    let shutdown = shutdown::install_shutdown_handler();

    let bus = Arc::new(
        NotificationBus::new(notifications, config.notification_buffer)
            .with_retry(config.retry_policy()),
    );
    let service = JobService::new(
        jobs,
        Arc::clone(&bus),
        PaymentNotifier::spawn(Arc::new(LoggingPaymentGateway)),
        Arc::new(SystemClock),
        config.policy(),
    );

    // Start the settlement sweep
    let sweeper = SettlementSweeper::new(service.clone(), config.sweep_interval);
    let sweep_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { sweeper.run(shutdown).await }
    });

    // Live notification streams never end on their own
    tokio::spawn({
        let shutdown = shutdown.clone();
        let bus = Arc::clone(&bus);
        async move {
            shutdown.cancelled().await;
            bus.close_sessions();
        }
    });

    // Build router with all API endpoints
    let app = api::create_router(AppState::new(service, bus));

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("Server error")?;

    sweep_handle.await.context("Settlement sweep panicked")?;

    tracing::info!("Limpfy server stopped");
    Ok(())
}
