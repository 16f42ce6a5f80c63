use crate::api::response::success;
use axum::{http::StatusCode, response::Response};

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up")),
    tag = "auth-global"
)]
pub async fn root() -> Response {
    success(StatusCode::OK, "OK")
}
