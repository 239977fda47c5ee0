use thiserror::Error;

/// Failure classes of quiz operations.
///
/// The first three are request-level: nothing has been persisted when they
/// are returned.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error("internal error: {0:#}")]
    Internal(color_eyre::Report),
}

impl From<color_eyre::Report> for QuizError {
    fn from(report: color_eyre::Report) -> Self {
        QuizError::Internal(report)
    }
}

impl QuizError {
    pub fn not_found(what: impl Into<String>) -> Self {
        QuizError::NotFound(what.into())
    }

    pub fn invalid_state(what: impl Into<String>) -> Self {
        QuizError::InvalidState(what.into())
    }

    pub fn invalid_input(what: impl Into<String>) -> Self {
        QuizError::InvalidInput(what.into())
    }
}

pub type QuizResult<T> = Result<T, QuizError>;
