use crate::{
    accounts,
    api::{
        response::{success, ApiError, ErrorBody},
        AppContext,
    },
};
use axum::{extract::Extension, http::StatusCode, response::Response, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    token: String,
    email: String,
    name: String,
}

#[utoipa::path(
    post,
    path = "/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = LoginResponse),
        (status = 422, description = "Invalid input or credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(ctx, payload))]
pub async fn login(
    ctx: Extension<Arc<AppContext>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::invalid_body());
    };

    let outcome = ctx
        .accounts()
        .login(&request.email, &request.password)
        .await
        .map_err(|err| match err {
            // wrong credentials are an input problem on this route, not a token failure
            accounts::Error::Authentication(msg) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            other => other.into(),
        })?;

    Ok(success(
        StatusCode::OK,
        LoginResponse {
            token: outcome.token,
            email: outcome.email,
            name: outcome.name,
        },
    ))
}
