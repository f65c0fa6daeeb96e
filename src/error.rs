//! Unified client error handling
//!
//! Every store, client call and calendar operation reports failures through
//! [`ApiError`]. `user_message` is what gets shown to the person at the
//! dashboard; `Display` is for logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rejected locally before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Backend error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Report job failed remotely or its status could not be read.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Task did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Checkpoint storage error: {0}")]
    Checkpoint(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::TaskFailed(_) => "TASK_FAILED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Checkpoint(_) => "CHECKPOINT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::Validation(msg)
            | Self::TaskFailed(msg) => msg.clone(),
            Self::Unavailable(_) => {
                "The dashboard service is unreachable. Please try again shortly.".to_string()
            }
            Self::Timeout { .. } => {
                "The report is taking longer than expected. Check the run history later."
                    .to_string()
            }
            // Don't leak internal error details
            Self::InvalidResponse(_)
            | Self::Remote { .. }
            | Self::Checkpoint(_)
            | Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Errors raised locally for bad caller input, as opposed to remote failures.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_has_distinct_user_message() {
        let timeout = ApiError::Timeout { seconds: 120 }.user_message();
        let failure = ApiError::Remote {
            status: 500,
            message: "boom".to_string(),
        }
        .user_message();

        assert_ne!(timeout, failure);
        assert!(timeout.contains("longer than expected"));
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::Internal(anyhow::anyhow!("db password leaked"));
        assert!(!err.user_message().contains("password"));
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn validation_is_an_input_error() {
        let err = ApiError::Validation("Please select a week".to_string());
        assert!(err.is_input_error());
        assert_eq!(err.user_message(), "Please select a week");
        assert!(!ApiError::Unavailable("down".to_string()).is_input_error());
    }
}
