use std::fmt;

use thiserror::Error;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Storage(String),
    Submission(SubmissionError),
    Configuration(String),
    Serialization(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    /// Only remote submission failures are worth attempting again.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AppError::Submission(_))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Submission(err) => write!(f, "Submission error: {}", err),
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Failure of a single ingest call. Recorded against the event, never fatal to a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unreadable acknowledgement: {0}")]
    InvalidAck(String),
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        AppError::Submission(err)
    }
}

impl From<reqwest::Error> for SubmissionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmissionError::Timeout
        } else {
            SubmissionError::Transport(err.to_string())
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_submission_errors_are_retriable() {
        assert!(AppError::from(SubmissionError::Timeout).is_retriable());
        assert!(!AppError::Storage("disk full".into()).is_retriable());
        assert!(!AppError::validation("missing note").is_retriable());
    }

    #[test]
    fn rejected_submission_display_includes_status() {
        let err = SubmissionError::Rejected {
            status: 422,
            body: "bad payload".into(),
        };
        assert_eq!(err.to_string(), "rejected with status 422: bad payload");
        assert_eq!(
            AppError::from(err).to_string(),
            "Submission error: rejected with status 422: bad payload"
        );
    }
}
