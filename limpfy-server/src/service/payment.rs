//! Payment side effects
//!
//! Capture on job creation and release on payout are handed to a background
//! task and never awaited by the request path. A failing gateway is logged
//! and does not affect the job record.

use std::sync::Arc;

use async_trait::async_trait;
use limpfy_core::domain::job::Job;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Instruction sent to the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PaymentInstruction {
    /// Hold the client's funds for a newly created job
    Capture {
        job_id: Uuid,
        client_id: String,
        amount_cents: i64,
    },
    /// Pay the held funds out to the worker
    Release {
        job_id: Uuid,
        worker_id: String,
        amount_cents: i64,
    },
}

impl PaymentInstruction {
    pub fn capture(job: &Job) -> Self {
        PaymentInstruction::Capture {
            job_id: job.id,
            client_id: job.client_id.clone(),
            amount_cents: job.price_cents,
        }
    }

    /// `None` when the job has no worker to pay
    pub fn release(job: &Job) -> Option<Self> {
        job.worker_id.as_ref().map(|worker_id| PaymentInstruction::Release {
            job_id: job.id,
            worker_id: worker_id.clone(),
            amount_cents: job.price_cents,
        })
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            PaymentInstruction::Capture { job_id, .. } => *job_id,
            PaymentInstruction::Release { job_id, .. } => *job_id,
        }
    }
}

/// External payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn execute(&self, instruction: &PaymentInstruction) -> anyhow::Result<()>;
}

/// Gateway that only records instructions in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPaymentGateway;

#[async_trait]
impl PaymentGateway for LoggingPaymentGateway {
    async fn execute(&self, instruction: &PaymentInstruction) -> anyhow::Result<()> {
        info!(job_id = %instruction.job_id(), ?instruction, "Payment instruction");
        Ok(())
    }
}

/// Fire-and-forget handle feeding a [`PaymentGateway`]
#[derive(Clone)]
pub struct PaymentNotifier {
    tx: mpsc::UnboundedSender<PaymentInstruction>,
}

impl PaymentNotifier {
    /// Spawns the task draining instructions into `gateway`
    ///
    /// The task ends once every notifier clone is dropped.
    pub fn spawn(gateway: Arc<dyn PaymentGateway>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PaymentInstruction>();

        tokio::spawn(async move {
            while let Some(instruction) = rx.recv().await {
                if let Err(e) = gateway.execute(&instruction).await {
                    warn!(
                        job_id = %instruction.job_id(),
                        "Payment gateway failed: {:#}",
                        e
                    );
                }
            }
            debug!("Payment notifier stopped");
        });

        Self { tx }
    }

    pub fn notify(&self, instruction: PaymentInstruction) {
        if let Err(e) = self.tx.send(instruction) {
            warn!(job_id = %e.0.job_id(), "Payment notifier closed, dropping instruction");
        }
    }
}
