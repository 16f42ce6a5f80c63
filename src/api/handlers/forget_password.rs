use super::flag;
use crate::api::{
    response::{success_with, ApiError, ErrorBody},
    AppContext,
};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema, Deserialize, Debug)]
pub struct ForgetRequest {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
pub struct ResetParams {
    /// `true` to return the generated password, if the server allows it
    visible: Option<String>,
    /// `true` to mail the generated password
    notify: Option<String>,
}

#[derive(ToSchema, Serialize)]
pub struct GeneratedPassword {
    email: String,
    generated_password: String,
    request_time: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ResetRequested {
    email: String,
    request_time: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/v1/forget-password",
    params(ResetParams),
    request_body = ForgetRequest,
    responses(
        (status = 200, description = "Password regenerated", body = ResetRequested),
        (status = 404, description = "No account for this email", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(ctx, params, payload))]
pub async fn forget_password(
    ctx: Extension<Arc<AppContext>>,
    Query(params): Query<ResetParams>,
    payload: Option<Json<ForgetRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::invalid_body());
    };

    let outcome = ctx
        .accounts()
        .forget_password(
            &request.email,
            flag(params.visible.as_deref()),
            flag(params.notify.as_deref()),
        )
        .await?;

    Ok(match outcome.generated_password {
        Some(generated_password) => success_with(
            StatusCode::OK,
            "new password generated",
            GeneratedPassword {
                email: outcome.email,
                generated_password,
                request_time: outcome.request_time,
            },
        ),
        None => success_with(
            StatusCode::OK,
            "Kindly check your email inbox/spam",
            ResetRequested {
                email: outcome.email,
                request_time: outcome.request_time,
            },
        ),
    })
}
