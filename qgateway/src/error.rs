//! Gateway error kinds and error value helpers.
//!
//! ```rust
//! use qgateway::GatewayError;
//!
//! let unavailable = GatewayError::unavailable("connection refused");
//! assert!(unavailable.retryable);
//!
//! let interrupted = GatewayError::interrupted("stream cut mid-reply");
//! assert!(!interrupted.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Failure before any fragment was produced. The whole call is safe to
    /// redo because nothing reached the caller and nothing was billed.
    Unavailable,
    /// Failure after fragments were already delivered. Never retried
    /// automatically; partial output must be accounted for first.
    Interrupted,
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unavailable, message, true)
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Interrupted, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transport, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Other, message, false)
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for GatewayError {}
