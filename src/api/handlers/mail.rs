use crate::{
    api::{
        response::{success_with, ApiError, ErrorBody},
        AppContext,
    },
    notify::Mail,
};
use axum::{extract::Extension, http::StatusCode, response::Response};
use std::sync::Arc;
use tracing::{error, instrument};

const TEST_SUBJECT: &str = "Test mail";
const TEST_BODY: &str = "Mail delivery is working.";

/// Send a test mail to the configured sender address and wait for the result.
#[utoipa::path(
    get,
    path = "/v1/mail",
    responses(
        (status = 200, description = "Test mail delivered"),
        (status = 500, description = "Delivery failed", body = ErrorBody),
        (status = 503, description = "No sender address configured", body = ErrorBody)
    ),
    tag = "auth-global"
)]
#[instrument(skip(ctx))]
pub async fn mail(ctx: Extension<Arc<AppContext>>) -> Result<Response, ApiError> {
    let Some(sender) = ctx.mail_sender() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "mail is not configured",
        ));
    };

    let mail = Mail::new(sender, TEST_SUBJECT, TEST_BODY);
    if let Err(err) = ctx.notifier().send(&mail).await {
        error!("Test mail failed: {err:#}");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            crate::accounts::error::INTERNAL_MESSAGE,
        ));
    }

    Ok(success_with(StatusCode::OK, "OK", "Success"))
}
