use std::time::Duration;

use axum::http::{header::RETRY_AFTER, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

mod schema;

pub type AppResult<T, E = AppError> = std::result::Result<T, E>;

pub const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";

/// A common error type that can be used throughout the API.
///
/// Can be returned in a `Result` from an API handler function. Each variant maps to a
/// status code and a `{success: false, message}` JSON body. Unexpected errors never leak
/// their details to the caller; they are logged instead.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("rate limit exceeded, retry after {0:?}")]
    RateLimited(Duration),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::ValidationError(message) => {
                tracing::info!(%message, "rejected invalid request");
                (status, Json(schema::Error::new(message))).into_response()
            }
            Self::RateLimited(retry_after) => {
                // round up so clients never retry inside the current window
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                (
                    status,
                    [(RETRY_AFTER, secs.to_string())],
                    Json(schema::Error::new(TOO_MANY_REQUESTS)),
                )
                    .into_response()
            }
            Self::UnexpectedError(ref e) => {
                tracing::error!("{:?}", e);
                (status, Json(schema::Error::new("Unexpected error"))).into_response()
            }
        }
    }
}
