use axum::http::{header::AUTHORIZATION, HeaderMap, Uri};

pub const TOKEN_QUERY_PARAM: &str = "token";

/// Pull the bearer token out of a request.
///
/// The `token` query parameter wins over the `Authorization: Bearer <token>`
/// header. Returns an empty string when neither is present, which never verifies.
#[must_use]
pub fn extract(uri: &Uri, headers: &HeaderMap) -> String {
    if let Some(token) = uri.query().and_then(from_query) {
        return token;
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(from_authorization)
        .unwrap_or_default()
}

fn from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == TOKEN_QUERY_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

fn from_authorization(value: &str) -> Option<String> {
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Some((*token).to_string())
        }
        _ => None,
    }
}
