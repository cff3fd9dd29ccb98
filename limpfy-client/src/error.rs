//! Error types for the Limpfy client

use limpfy_core::lifecycle::Recovery;
use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Limpfy client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server refused the request with a structured error body
    #[error("{message} ({code}, status {status})")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Stable error code, e.g. `conflict` or `deadline-passed`
        code: String,
        message: String,
        /// Suggested next step
        recovery: Recovery,
    },

    /// API returned an error status without a structured body
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Raw response body
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
    #[serde(default = "no_recovery")]
    recovery: Recovery,
}

fn no_recovery() -> Recovery {
    Recovery::None
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Decodes an error response body, falling back to the raw text
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self::Rejected {
                status,
                code: parsed.code,
                message: parsed.error,
                recovery: parsed.recovery,
            },
            Err(_) => Self::api_error(status, body),
        }
    }

    /// HTTP status of a server-side failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable error code of a structured rejection
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Suggested next step; `Recovery::None` when the server gave none
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Rejected { recovery, .. } => *recovery,
            _ => Recovery::None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Another write committed first; re-fetch before retrying
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| (400..500).contains(&status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_body_is_decoded() {
        let err = ClientError::from_body(
            422,
            r#"{"error":"the dispute window closed","code":"deadline-passed","recovery":"request-help"}"#,
        );

        assert_eq!(err.code(), Some("deadline-passed"));
        assert_eq!(err.recovery(), Recovery::RequestHelp);
        assert!(err.is_client_error());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_plain_body_falls_back() {
        let err = ClientError::from_body(502, "Bad Gateway");
        assert!(matches!(err, ClientError::ApiError { status: 502, .. }));
        assert!(err.is_server_error());
        assert_eq!(err.recovery(), Recovery::None);
    }
}
