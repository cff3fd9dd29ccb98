//! Server configuration
//!
//! Every setting has a default so a bare `limpfy-server` starts against the
//! in-memory store on port 8080.

use std::time::Duration;

use limpfy_core::lifecycle::{
    DEFAULT_DISPUTE_WINDOW_MINUTES, DEFAULT_SUPPORT_INBOX, LifecyclePolicy,
};

use crate::service::RetryPolicy;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Minutes between completion and automatic payout
    pub dispute_window_minutes: i64,

    /// How often the settlement sweep runs
    pub sweep_interval: Duration,

    /// Live notifications buffered per recipient before slow sessions lag
    pub notification_buffer: usize,

    /// Recipient id of the support inbox
    pub support_inbox: String,

    /// Background retries for inbox writes that failed after a commit
    pub publish_retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            dispute_window_minutes: DEFAULT_DISPUTE_WINDOW_MINUTES,
            sweep_interval: Duration::from_secs(60),
            notification_buffer: 64,
            support_inbox: DEFAULT_SUPPORT_INBOX.to_string(),
            publish_retry_attempts: RetryPolicy::default().attempts,
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized variables:
    /// - DATABASE_URL (optional, in-memory store when unset)
    /// - BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - DISPUTE_WINDOW_MINUTES (optional, default: 30)
    /// - SWEEP_INTERVAL_SECS (optional, default: 60)
    /// - NOTIFICATION_BUFFER (optional, default: 64)
    /// - SUPPORT_INBOX (optional, default: support)
    /// - PUBLISH_RETRY_ATTEMPTS (optional, default: 5)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let bind_addr = lookup("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let dispute_window_minutes = match lookup("DISPUTE_WINDOW_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("invalid DISPUTE_WINDOW_MINUTES '{raw}': {e}"))?,
            None => defaults.dispute_window_minutes,
        };

        let sweep_interval = match lookup("SWEEP_INTERVAL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| anyhow::anyhow!("invalid SWEEP_INTERVAL_SECS '{raw}': {e}"))?,
            None => defaults.sweep_interval,
        };

        let notification_buffer = match lookup("NOTIFICATION_BUFFER") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid NOTIFICATION_BUFFER '{raw}': {e}"))?,
            None => defaults.notification_buffer,
        };

        let support_inbox = lookup("SUPPORT_INBOX").unwrap_or(defaults.support_inbox);

        let publish_retry_attempts = match lookup("PUBLISH_RETRY_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("invalid PUBLISH_RETRY_ATTEMPTS '{raw}': {e}"))?,
            None => defaults.publish_retry_attempts,
        };

        let config = Self {
            database_url,
            bind_addr,
            dispute_window_minutes,
            sweep_interval,
            notification_buffer,
            support_inbox,
            publish_retry_attempts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.dispute_window_minutes <= 0 {
            anyhow::bail!("dispute_window_minutes must be greater than 0");
        }

        if self.sweep_interval.as_secs() == 0 {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        if self.notification_buffer == 0 {
            anyhow::bail!("notification_buffer must be greater than 0");
        }

        if self.support_inbox.trim().is_empty() {
            anyhow::bail!("support_inbox cannot be empty");
        }

        Ok(())
    }

    /// Lifecycle parameters derived from this configuration
    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            dispute_window: chrono::Duration::minutes(self.dispute_window_minutes),
            support_inbox: self.support_inbox.clone(),
        }
    }

    /// Backoff for notification writes that failed after a commit
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.publish_retry_attempts,
            ..RetryPolicy::default()
        }
    }
}
