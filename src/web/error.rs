// src/web/error.rs
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

use super::types::StandardErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Job queue is unavailable")]
    QueueUnavailable,

    #[error("Database not configured")]
    DatabaseNotConfigured,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::QueueUnavailable | ApiError::DatabaseNotConfigured => {
                Status::ServiceUnavailable
            }
            ApiError::Internal => Status::InternalServerError,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::QueueUnavailable => "QUEUE_UNAVAILABLE",
            ApiError::DatabaseNotConfigured => "DATABASE_NOT_CONFIGURED",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            ApiError::NotFound(_) => &["Check the id returned at submission"],
            ApiError::Validation(_) => &["Provide non-empty text for every analysed field"],
            ApiError::QueueUnavailable => &["Try again in a few moments"],
            ApiError::DatabaseNotConfigured => &["Set DATABASE_URL to enable record storage"],
            ApiError::Internal => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        hints.iter().map(|hint| hint.to_string()).collect()
    }

    pub fn body(&self) -> StandardErrorResponse {
        StandardErrorResponse::new(
            self.to_string(),
            self.error_code().to_string(),
            self.suggestions(),
        )
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let mut response = Json(self.body()).respond_to(request)?;
        response.set_status(status);
        Ok(response)
    }
}
