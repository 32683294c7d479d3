use crate::model::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fluster_shortener::ShortenerError;
use tracing::info;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// The body was not a JSON gateway request.
    UnreadableBody,
    Shortener(ShortenerError),
}

impl From<ShortenerError> for AppError {
    fn from(err: ShortenerError) -> Self {
        AppError::Shortener(err)
    }
}

// Every failure is a 400: callers cannot tell a malicious URL from an
// unreachable one or a storage outage by status alone.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::UnreadableBody => "failed to read request body".to_string(),
            AppError::Shortener(err) => {
                info!(stage = %err.stage(), error = %err, "request failed");
                err.to_string()
            }
        };

        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
    }
}
