use crate::{
    api::{
        response::{success, ApiError},
        AppContext,
    },
    crypto::secrets_match,
    token,
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/api-secret",
    params(("token" = Option<String>, Query, description = "Accepted token")),
    responses(
        (status = 200, description = "Signing secret"),
        (status = 404, description = "Token not accepted", body = crate::api::response::ErrorBody)
    ),
    tag = "auth-global"
)]
pub async fn api_secret(ctx: Extension<Arc<AppContext>>, uri: Uri, headers: HeaderMap) -> Response {
    let token = token::extract(&uri, &headers);

    let accepted = ctx
        .accepted_token()
        .is_some_and(|accepted| {
            !token.is_empty() && secrets_match(accepted.expose_secret().as_bytes(), token.as_bytes())
        });

    if !accepted {
        debug!("api secret requested without accepted token");
        return ApiError::not_found().into_response();
    }

    success(StatusCode::OK, ctx.api_secret().expose_secret())
}
