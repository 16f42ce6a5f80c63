use super::{ApiError, AppContext};
use crate::{store::AccountId, token};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tracing::{debug, error};

/// Account id carried by a verified bearer token.
///
/// Rejects with 401 `unauthorized` when the token is missing or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated(pub AccountId);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(ctx) = parts.extensions.get::<Arc<AppContext>>().cloned() else {
            error!("application context missing from request extensions");
            return Err(ApiError::unauthorized());
        };

        let token = token::extract(&parts.uri, &parts.headers);

        match ctx.accounts().tokens().verify(&token) {
            Ok(id) => Ok(Self(id)),
            Err(err) => {
                debug!("token rejected: {err}");
                Err(ApiError::unauthorized())
            }
        }
    }
}
