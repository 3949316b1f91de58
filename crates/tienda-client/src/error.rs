//! # Client Error Types
//!
//! Error types for everything that crosses the network boundary.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Validation    │  │    Conflict     │  │      Transport          │ │
//! │  │  (local, no I/O)│  │ (backend said no)│  │  (no usable answer)    │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  SessionAlready │  │  Transport              │ │
//! │  │  Config         │  │    Active       │  │  Server (5xx)           │ │
//! │  │                 │  │  Conflict (409) │  │  Decode                 │ │
//! │  │                 │  │  Rejected (4xx) │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │      Auth       │  401: token cleared, shell routes to login        │
//! │  │  Unauthorized   │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use tienda_core::{CoreError, ValidationError};

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Coarse classification the UI uses to pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally; nothing was sent.
    Validation,
    /// The backend refused the request; its message is shown verbatim.
    Conflict,
    /// No answer, or an answer we couldn't use.
    Transport,
    /// The session token is gone; re-authenticate.
    Auth,
}

/// Every way a backend-facing operation can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Cart or amount rule violated before any request was made.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // Backend Refusals
    // =========================================================================
    /// The operator already has an open cash session.
    #[error("{0}")]
    SessionAlreadyActive(String),

    /// 409 on any other endpoint (e.g. stock changed since the snapshot).
    #[error("{0}")]
    Conflict(String),

    /// Any other 4xx.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// 401: the bearer token is no longer valid.
    #[error("Session expired, please sign in again")]
    Unauthorized,

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// 5xx from the backend.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Connection refused, DNS failure, timeout.
    #[error("Cannot reach backend: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("Unexpected response from backend: {0}")]
    Decode(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Core(CoreError::Validation(err))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ClientError::Transport(format!("request timed out: {err}"));
        }
        if err.is_connect() {
            return ClientError::Transport(format!("connection failed: {err}"));
        }
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        if err.is_builder() {
            return ClientError::Config(err.to_string());
        }
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {err}"))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Config(format!("failed to read config: {err}"))
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(format!("failed to parse config: {err}"))
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Core(_) | ClientError::Config(_) => ErrorKind::Validation,
            ClientError::SessionAlreadyActive(_)
            | ClientError::Conflict(_)
            | ClientError::Rejected { .. } => ErrorKind::Conflict,
            ClientError::Unauthorized => ErrorKind::Auth,
            ClientError::Server { .. }
            | ClientError::Transport(_)
            | ClientError::Decode(_) => ErrorKind::Transport,
        }
    }

    /// True when the request never reached the backend.
    pub fn is_local(&self) -> bool {
        matches!(self, ClientError::Core(_) | ClientError::Config(_))
    }

    /// Text for the operator.
    ///
    /// Backend refusals are passed through exactly as the backend worded them.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::SessionAlreadyActive(msg) | ClientError::Conflict(msg) => msg.clone(),
            ClientError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ClientError::Core(CoreError::EmptyCart).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClientError::SessionAlreadyActive("ya existe".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(ClientError::Unauthorized.kind(), ErrorKind::Auth);
        assert_eq!(
            ClientError::Transport("refused".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ClientError::Server {
                status: 503,
                message: "down".into()
            }
            .kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = ClientError::SessionAlreadyActive("Ya existe una caja abierta".into());
        assert_eq!(err.user_message(), "Ya existe una caja abierta");
        assert_eq!(err.to_string(), "Ya existe una caja abierta");

        let err = ClientError::Rejected {
            status: 400,
            message: "Stock insuficiente".into(),
        };
        assert_eq!(err.user_message(), "Stock insuficiente");
    }

    #[test]
    fn test_core_errors_stay_local() {
        let err: ClientError = CoreError::CustomerRequired.into();
        assert!(err.is_local());
        assert_eq!(
            err.user_message(),
            "Select a customer before completing the sale"
        );
    }
}
