//! Error taxonomy surfaced by credit operations.

use serde::Serialize;
use thiserror::Error;

use tillcredit_core::DomainError;

pub type CreditResult<T> = Result<T, CreditError>;

/// Failure reported by a record store or history provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or the query failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with data that violates its contract.
    #[error("store returned malformed data: {0}")]
    Malformed(String),
}

/// Stable error classification carried in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    UpstreamError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::UpstreamError => "upstream_error",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CreditError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl CreditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CreditError::NotFound(_) => ErrorKind::NotFound,
            CreditError::Validation(_) => ErrorKind::ValidationError,
            CreditError::Upstream(_) => ErrorKind::UpstreamError,
        }
    }
}

impl From<DomainError> for CreditError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => CreditError::Validation(msg),
            DomainError::NotFound(what) => CreditError::NotFound(what),
        }
    }
}

impl From<StoreError> for CreditError {
    fn from(value: StoreError) -> Self {
        CreditError::Upstream(value.to_string())
    }
}
