//! Session-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use qgateway::{GatewayError, GatewayErrorKind};
use qledger::{LedgerError, LedgerErrorKind};
use qstore::{StoreError, StoreErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    InvalidRequest,
    NotFound,
    InsufficientBalance,
    Gateway,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::NotFound, message)
    }

    pub fn insufficient_balance(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InsufficientBalance, message)
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Gateway, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Storage, message)
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for SessionError {}

impl From<GatewayError> for SessionError {
    fn from(value: GatewayError) -> Self {
        match value.kind {
            GatewayErrorKind::InvalidRequest => SessionError::invalid_request(value.message),
            _ => SessionError::gateway(value.message),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        match value.kind {
            StoreErrorKind::NotFound => SessionError::not_found(value.message),
            StoreErrorKind::InvalidRequest => SessionError::invalid_request(value.message),
            _ => SessionError::storage(value.message),
        }
    }
}

impl From<LedgerError> for SessionError {
    fn from(value: LedgerError) -> Self {
        match value.kind {
            LedgerErrorKind::NotFound => SessionError::not_found(value.message),
            LedgerErrorKind::InsufficientBalance => {
                SessionError::insufficient_balance(value.message)
            }
            LedgerErrorKind::InvalidRequest => SessionError::invalid_request(value.message),
            LedgerErrorKind::Storage => SessionError::storage(value.message),
        }
    }
}
