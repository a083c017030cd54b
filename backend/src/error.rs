use std::time::Duration;

use rocket::http::{Header, Status};
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorKind, ErrorResponse, ValidationError};
use thiserror::Error;
use tracing::error;

use crate::processor::SubmitError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Invalid nominee ID: {0}")]
    UnknownNominee(i64),
    #[error("You have already voted")]
    DuplicateVote,
    #[error("{0}")]
    Storage(&'static str),
    #[error("Too many vote attempts, retry in {} seconds", .0.as_secs().max(1))]
    RateLimited(Duration),
    #[error("Admin token missing or invalid")]
    Forbidden,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ApiError::UnknownNominee(_) => ErrorKind::UnknownNominee,
            ApiError::DuplicateVote => ErrorKind::DuplicateVote,
            ApiError::Storage(_) => ErrorKind::StorageError,
            ApiError::RateLimited(_) => ErrorKind::RateLimited,
            ApiError::Forbidden => ErrorKind::Forbidden,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::InvalidRequest(_) | ApiError::UnknownNominee(_) | ApiError::DuplicateVote => {
                Status::BadRequest
            }
            ApiError::Storage(_) => Status::InternalServerError,
            ApiError::RateLimited(_) => Status::TooManyRequests,
            ApiError::Forbidden => Status::Forbidden,
        }
    }

    /// Logs the store failure and hides its details from the caller.
    pub fn storage(message: &'static str, cause: &StoreError) -> Self {
        error!("{}: {}", message, cause);
        ApiError::Storage(message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::UnknownNominee(id) => ApiError::UnknownNominee(id),
            other => ApiError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Invalid(v) => v.into(),
            SubmitError::DuplicateVote => ApiError::DuplicateVote,
            SubmitError::Storage(cause) => ApiError::storage("Failed to submit vote", &cause),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let retry_after = match &self {
            ApiError::RateLimited(wait) => Some(wait.as_secs().max(1)),
            _ => None,
        };
        let body = Json(ErrorResponse::new(self.kind(), self.to_string()));

        let mut response = rocket::Response::build_from(body.respond_to(req)?);
        response.status(status);
        if let Some(secs) = retry_after {
            response.header(Header::new("Retry-After", secs.to_string()));
        }
        response.ok()
    }
}
