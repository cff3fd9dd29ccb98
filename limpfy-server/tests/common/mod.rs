#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use limpfy_core::lifecycle::LifecyclePolicy;
use limpfy_server::api::{self, AppState};
use limpfy_server::repository::{MemoryJobRepository, MemoryNotificationRepository};
use limpfy_server::scheduler::SettlementSweeper;
use limpfy_server::service::{
    JobService, LoggingPaymentGateway, ManualClock, NotificationBus, PaymentNotifier,
};

/// Everything a test needs, wired to the in-memory store and a manual clock
pub struct TestMarketplace {
    pub service: JobService,
    pub bus: Arc<NotificationBus>,
    pub clock: Arc<ManualClock>,
    pub jobs: Arc<MemoryJobRepository>,
}

impl TestMarketplace {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let jobs = Arc::new(MemoryJobRepository::new());
        let bus = Arc::new(NotificationBus::new(
            Arc::new(MemoryNotificationRepository::new()),
            32,
        ));
        let service = JobService::new(
            jobs.clone(),
            bus.clone(),
            PaymentNotifier::spawn(Arc::new(LoggingPaymentGateway)),
            clock.clone(),
            LifecyclePolicy::default(),
        );

        Self {
            service,
            bus,
            clock,
            jobs,
        }
    }

    pub fn router(&self) -> axum::Router {
        api::create_router(AppState::new(self.service.clone(), self.bus.clone()))
    }

    pub fn sweeper(&self) -> SettlementSweeper {
        SettlementSweeper::new(self.service.clone(), std::time::Duration::from_secs(60))
    }
}
