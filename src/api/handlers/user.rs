use super::flag;
use crate::api::{
    response::{success, success_with, ApiError, ErrorBody},
    AppContext, Authenticated,
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

#[derive(ToSchema, Serialize, Debug)]
pub struct UserResponse {
    public_id: String,
    name: String,
    email: String,
    last_update: DateTime<Utc>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct EditRequest {
    #[serde(default)]
    name: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct EditResponse {
    public_id: String,
    email: String,
    name: String,
    last_updated: DateTime<Utc>,
}

#[derive(ToSchema, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for PasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordRequest")
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct PasswordChanged {
    public_id: String,
    email: String,
    password_changed_at: DateTime<Utc>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
pub struct NotifyParams {
    /// `true` to mail a notice to the account owner
    notify: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/user",
    params(("token" = Option<String>, Query, description = "Bearer token, instead of the Authorization header")),
    responses(
        (status = 200, description = "Profile of the token owner", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip(ctx))]
pub async fn show(
    Authenticated(id): Authenticated,
    ctx: Extension<Arc<AppContext>>,
) -> Result<Response, ApiError> {
    let view = ctx.accounts().show(id).await?;

    Ok(success(
        StatusCode::OK,
        UserResponse {
            public_id: view.public_id,
            name: view.name,
            email: view.email,
            last_update: view.updated_at,
        },
    ))
}

#[utoipa::path(
    put,
    path = "/v1/user/edit",
    request_body = EditRequest,
    responses(
        (status = 200, description = "Profile updated", body = EditResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip(ctx, payload))]
pub async fn edit(
    Authenticated(id): Authenticated,
    ctx: Extension<Arc<AppContext>>,
    payload: Option<Json<EditRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::invalid_body());
    };

    let view = ctx.accounts().update_profile(id, &request.name).await?;

    Ok(success(
        StatusCode::OK,
        EditResponse {
            public_id: view.public_id,
            email: view.email,
            name: view.name,
            last_updated: view.updated_at,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/v1/user/change-password",
    params(NotifyParams),
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = PasswordChanged),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip(ctx, params, payload))]
pub async fn change_password(
    Authenticated(id): Authenticated,
    ctx: Extension<Arc<AppContext>>,
    Query(params): Query<NotifyParams>,
    payload: Option<Json<PasswordRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::invalid_body());
    };

    let view = ctx
        .accounts()
        .change_password(id, &request.password, flag(params.notify.as_deref()))
        .await?;

    Ok(success_with(
        StatusCode::OK,
        "new password created",
        PasswordChanged {
            public_id: view.public_id,
            email: view.email,
            password_changed_at: view.updated_at,
        },
    ))
}
