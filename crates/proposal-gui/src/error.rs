use axum::{Json, http::StatusCode, response::IntoResponse};
use proposal_core::ProposalError;
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let payload = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(payload)).into_response()
    }
}

impl From<ProposalError> for AppError {
    fn from(error: ProposalError) -> Self {
        let status = match &error {
            ProposalError::Validation(_) => StatusCode::BAD_REQUEST,
            ProposalError::StageFailed { .. }
            | ProposalError::Search(_)
            | ProposalError::FileSink { .. }
            | ProposalError::ToolFailed(_)
            | ProposalError::Model(_)
            | ProposalError::Pipeline(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}
