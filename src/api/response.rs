//! JSON envelope shared by every endpoint: `{success, message, data}`.

use crate::accounts;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// Successful reply with the canonical status text as message.
pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    success_with(status, status_text(status), data)
}

pub fn success_with<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    let envelope = Envelope {
        success: true,
        message: message.into(),
        data,
    };
    (status, Json(envelope)).into_response()
}

/// Error reply. `message` is the curated text shown as `data.error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    #[must_use]
    pub fn invalid_body() -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid request body")
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<accounts::Error> for ApiError {
    fn from(err: accounts::Error) -> Self {
        let status = match &err {
            accounts::Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            accounts::Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            accounts::Error::NotFound(_) => StatusCode::NOT_FOUND,
            accounts::Error::Conflict(_) => StatusCode::CONFLICT,
            accounts::Error::Internal(cause) => {
                error!("internal error: {cause:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self::new(status, err.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: false,
            message: status_text(self.status),
            data: ErrorBody {
                error: self.message,
            },
        };
        (self.status, Json(envelope)).into_response()
    }
}
