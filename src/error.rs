// Error handling for audiolens
//
// This module defines the request-facing error type and its mapping to
// HTTP responses. Pipeline-side errors live next to the pipeline and are
// recorded into the job record instead of surfacing here.

use std::io;
use thiserror::Error;

use actix_web::{HttpResponse, ResponseError};

use crate::models::ErrorResponse;

/// Errors that can occur in the audiolens request handlers
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Error when processing multipart form data
    #[error("Form error: {0}")]
    FormError(String),

    /// Error during file I/O
    #[error("File error: {0}")]
    FileError(#[from] io::Error),

    /// A required multipart part was missing from the upload
    #[error("No {0} file provided in the request")]
    MissingPart(&'static str),

    /// An uploaded payload contained zero bytes
    #[error("{name} is empty")]
    EmptyPayload { name: String },

    /// An uploaded payload exceeded its configured ceiling
    #[error("{name} exceeds {limit_mb} MB limit")]
    PayloadTooLarge { name: String, limit_mb: u64 },

    /// Error when a job is not found
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Error when handing a job to the background workers
    #[error("Queue error: {0}")]
    QueueError(String),
}

impl HandlerError {
    /// Create a new FormError
    pub fn form_error<S: Into<String>>(msg: S) -> Self {
        Self::FormError(msg.into())
    }
}

impl ResponseError for HandlerError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            error: self.to_string(),
        };

        match self {
            HandlerError::FormError(_)
            | HandlerError::MissingPart(_)
            | HandlerError::EmptyPayload { .. } => HttpResponse::BadRequest().json(error_response),
            HandlerError::PayloadTooLarge { .. } => {
                HttpResponse::PayloadTooLarge().json(error_response)
            }
            HandlerError::JobNotFound(_) => HttpResponse::NotFound().json(error_response),
            _ => HttpResponse::InternalServerError().json(error_response),
        }
    }
}

/// Convert StoreError to HandlerError
impl From<crate::job_store::StoreError> for HandlerError {
    fn from(err: crate::job_store::StoreError) -> Self {
        use crate::job_store::StoreError;

        match err {
            StoreError::JobNotFound(id) => HandlerError::JobNotFound(id),
            StoreError::Io(e) => HandlerError::FileError(e),
            other => HandlerError::QueueError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_errors_map_to_client_status_codes() {
        let too_large = HandlerError::PayloadTooLarge {
            name: "lecture.mp3".into(),
            limit_mb: 500,
        };
        assert_eq!(too_large.error_response().status(), 413);
        assert!(too_large.to_string().contains("500 MB"));

        let empty = HandlerError::EmptyPayload {
            name: "notes.pdf".into(),
        };
        assert_eq!(empty.error_response().status(), 400);

        let missing = HandlerError::JobNotFound("nope".into());
        assert_eq!(missing.error_response().status(), 404);
    }
}
