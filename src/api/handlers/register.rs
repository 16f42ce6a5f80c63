use crate::api::{
    response::{success, ApiError, ErrorBody},
    AppContext,
};
use axum::{
    extract::Extension,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RegisterResponse {
    name: String,
    email: String,
    public_id: String,
    created_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 409, description = "Email already taken", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(ctx, headers, payload))]
pub async fn register(
    ctx: Extension<Arc<AppContext>>,
    uri: Uri,
    headers: HeaderMap,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::invalid_body());
    };

    let view = ctx
        .accounts()
        .register(&request.name, &request.email, &request.password)
        .await?;

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let location = format!("{host}{}/{}", uri.path(), view.public_id);

    let mut response = success(
        StatusCode::CREATED,
        RegisterResponse {
            name: view.name,
            email: view.email,
            public_id: view.public_id,
            created_at: view.created_at,
        },
    );

    match HeaderValue::from_str(&location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(err) => error!("Failed to build Location header: {err}"),
    }

    Ok(response)
}
