use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Unknown nominee")]
    UnknownNominee,
    #[error("Duplicate vote")]
    DuplicateVote,
    #[error("Storage error")]
    StorageError,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Operation not authorized")]
    Forbidden,
    #[error("Resource not found")]
    NotFound,
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self { error: error.into(), kind }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}
