use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures surfaced by the endpoint and event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("endpoint not found")]
    EndpointNotFound,
    #[error("endpoint has expired")]
    EndpointExpired,
    #[error("event not found")]
    EventNotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::Store(StoreError::EndpointNotFound) => (
                StatusCode::NOT_FOUND,
                "endpoint_not_found",
                "Endpoint not found".to_owned(),
            ),
            AppError::Store(StoreError::EndpointExpired) => (
                StatusCode::GONE,
                "endpoint_expired",
                "This webhook endpoint has expired".to_owned(),
            ),
            AppError::Store(StoreError::EventNotFound) => (
                StatusCode::NOT_FOUND,
                "event_not_found",
                "Event not found".to_owned(),
            ),
            AppError::BadRequest(message) => {
                tracing::debug!(message, "rejected request");
                (StatusCode::BAD_REQUEST, "bad_request", message.to_owned())
            }
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message: msg },
            }),
        )
            .into_response()
    }
}
