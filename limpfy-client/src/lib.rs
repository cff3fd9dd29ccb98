//! Limpfy HTTP Client
//!
//! A type-safe HTTP client for the Limpfy marketplace API. Every request is
//! sent on behalf of one actor, forwarded in the identity headers the server
//! expects from the upstream gateway.
//!
//! # Example
//!
//! ```no_run
//! use limpfy_client::MarketplaceClient;
//! use limpfy_core::domain::actor::Actor;
//! use limpfy_core::dto::job::CreateJob;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MarketplaceClient::new("http://localhost:8080", Actor::client("client-1"));
//!
//!     let job = client.create_job(CreateJob {
//!         title: "Two bedroom apartment".to_string(),
//!         description: String::new(),
//!         location: Default::default(),
//!         price_cents: 15_000,
//!         image_url: None,
//!     }).await?;
//!
//!     println!("Created job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod notifications;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use limpfy_core::lifecycle::Recovery;

use limpfy_core::domain::actor::Actor;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// HTTP client for the Limpfy marketplace API
///
/// Methods are grouped into:
/// - Job listings and lifecycle transitions
/// - Notification inbox management
#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Identity sent with every request
    actor: Actor,
}

impl MarketplaceClient {
    /// Create a new client acting as `actor`
    ///
    /// # Example
    /// ```
    /// use limpfy_client::MarketplaceClient;
    /// use limpfy_core::domain::actor::Actor;
    ///
    /// let client = MarketplaceClient::new("http://localhost:8080", Actor::worker("worker-a"));
    /// ```
    pub fn new(base_url: impl Into<String>, actor: Actor) -> Self {
        Self::with_client(base_url, Client::new(), actor)
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client, actor: Actor) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            actor,
        }
    }

    /// The same connection acting as someone else
    pub fn as_actor(&self, actor: Actor) -> Self {
        Self {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            actor,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the identity headers
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACTOR_ID_HEADER, &self.actor.id)
            .header(ACTOR_ROLE_HEADER, self.actor.role.as_str())
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let err = ClientError::from_body(status, &body);
        tracing::debug!("Request failed: {}", err);
        err
    }
}
