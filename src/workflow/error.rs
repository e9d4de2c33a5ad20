use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Failures surfaced by the approval workflow.
///
/// Every variant carries the message shown to the caller. Denials and guard
/// failures are expected outcomes and never leave partial writes behind.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum WorkflowError {
    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    /// The operation's status guard failed (e.g. approving a draft)
    #[display(fmt = "{}", _0)]
    InvalidState(String),

    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Leave cap or balance exceeded
    #[display(fmt = "{}", _0)]
    BusinessRule(String),

    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl std::error::Error for WorkflowError {}

impl WorkflowError {
    pub fn not_found(what: impl Into<String>) -> Self {
        WorkflowError::NotFound(format!("{} not found", what.into()))
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::InvalidState(_)
            | WorkflowError::Validation(_)
            | WorkflowError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // storage details stay in the logs
            WorkflowError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Storage operation failed");
        WorkflowError::Internal(e.to_string())
    }
}
