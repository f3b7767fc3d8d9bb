use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use service::auth::AuthError;
use service::errors::ServiceError;

/// Error surfaced by a handler, rendered as a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("JSON parse error - {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self { ApiError::Parse(e.to_string()) }
}

fn detail(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": msg.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(e) => match e {
                ServiceError::Validation(errs) => (StatusCode::BAD_REQUEST, Json(errs)).into_response(),
                ServiceError::NotFound(msg) => detail(StatusCode::NOT_FOUND, msg),
                ServiceError::Forbidden(msg) => detail(StatusCode::FORBIDDEN, msg),
                ServiceError::Conflict(msg) => detail(StatusCode::CONFLICT, msg),
                other @ (ServiceError::Db(_) | ServiceError::Model(_)) => {
                    error!(error = %other, "request failed");
                    detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
                }
            },
            ApiError::Auth(e) => match e {
                AuthError::Unauthorized | AuthError::Inactive => {
                    warn!(code = e.code(), "login refused");
                    detail(StatusCode::UNAUTHORIZED, "Invalid username or password.")
                }
                AuthError::Validation(msg) => detail(StatusCode::BAD_REQUEST, msg),
                AuthError::Conflict => detail(StatusCode::CONFLICT, e.to_string()),
                other => {
                    error!(code = other.code(), error = %other, "auth failure");
                    detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
                }
            },
            ApiError::Parse(msg) => detail(StatusCode::BAD_REQUEST, format!("JSON parse error - {msg}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid bind address {0}")]
    BindAddr(String),
    #[error("bootstrap admin: {0}")]
    Bootstrap(#[from] AuthError),
}
