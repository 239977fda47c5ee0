use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::QuizError;

pub enum AppError {
    Unauthorized,
    Input(String),
    Quiz(QuizError),
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        AppError::Quiz(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, error_code, message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "authentication required".to_string(),
            ),
            AppError::Input(msg) => (StatusCode::BAD_REQUEST, "INPUT_ERROR", msg),
            AppError::Quiz(err) => match err {
                QuizError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                QuizError::InvalidState(msg) => (StatusCode::CONFLICT, "INVALID_STATE", msg),
                QuizError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg),
                QuizError::Configuration(msg) => {
                    tracing::error!("configuration error: {msg}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR", msg)
                }
                QuizError::ExternalService(msg) => {
                    tracing::error!("external service failure: {msg}");
                    (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR", msg)
                }
                QuizError::Internal(report) => {
                    tracing::error!("internal error: {report:?}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_SERVER_ERROR",
                        "internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (code, body).into_response()
    }
}

pub trait ResultExt<T> {
    /// Log the underlying error and turn it into a request-level input error.
    fn reject_input(self, msg: &str) -> Result<T, AppError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn reject_input(self, msg: &str) -> Result<T, AppError> {
        self.map_err(|e| {
            tracing::warn!("{msg}: {e}");
            AppError::Input(format!("{msg}: {e}"))
        })
    }
}
