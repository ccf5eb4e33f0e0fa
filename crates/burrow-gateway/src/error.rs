use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::StoreError;
use burrow_shortener::{PipelineError, ShortenerError};
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    Gone(String),
    Unavailable(String),
    Internal(String),
}

impl From<ShortenerError> for AppError {
    fn from(err: ShortenerError) -> Self {
        match err {
            ShortenerError::InvalidUrl(message) | ShortenerError::InvalidRequest(message) => {
                AppError::BadRequest(message)
            }
            ShortenerError::Pipeline(PipelineError::EmptyRequest) => {
                AppError::BadRequest(PipelineError::EmptyRequest.to_string())
            }
            ShortenerError::Pipeline(PipelineError::Closed) => {
                AppError::Unavailable(PipelineError::Closed.to_string())
            }
            ShortenerError::Store(StoreError::Gone(code)) => {
                AppError::Gone(format!("{code} has been deleted"))
            }
            ShortenerError::Store(err) if err.is_client_error() => {
                AppError::BadRequest(err.to_string())
            }
            ShortenerError::Store(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing user id".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            AppError::Gone(message) => (StatusCode::GONE, message),
            AppError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal(message) => {
                error!(error = %message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
