//! Notification DTOs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: u64,
}

/// Number of inbox entries touched by a bulk operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AffectedCount {
    pub affected: u64,
}
