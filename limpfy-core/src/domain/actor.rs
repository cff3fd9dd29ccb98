//! Actor domain types
//!
//! Identity is established by an upstream layer; the lifecycle only sees the
//! resulting `(id, role)` pair and re-validates ownership per action.

use serde::{Deserialize, Serialize};

/// Identifier used for the internal settlement actor.
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Role an actor plays in the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Requests jobs and owns them
    Client,

    /// Accepts and fulfils jobs
    Worker,

    /// Internal actor driving deadline-based transitions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Worker => "worker",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "worker" => Ok(Role::Worker),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated entity issuing a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn client(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Client,
        }
    }

    pub fn worker(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Worker,
        }
    }

    /// The actor used by the settlement sweep
    pub fn system() -> Self {
        Self {
            id: SYSTEM_ACTOR_ID.to_string(),
            role: Role::System,
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}
