use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use axum::http::{HeaderMap, HeaderValue};

pub const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,PATCH,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type,Authorization,X-Requested-With,Accept,Origin";
pub const ALLOW_CREDENTIALS: &str = "true";
pub const MAX_AGE_SECONDS: &str = "86400";

/// Stamp the full cross-origin header set onto `headers`.
///
/// `Access-Control-Allow-Origin` echoes `origin` when the request carried one
/// and is `*` otherwise. Existing CORS values are overwritten.
pub fn apply_cors(headers: &mut HeaderMap, origin: Option<&HeaderValue>) {
    match origin {
        Some(origin) => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            headers.insert(VARY, HeaderValue::from_static("Origin"));
        }
        None => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static(ALLOW_CREDENTIALS),
    );
    headers.insert(
        ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECONDS),
    );
}

/// True when `headers` carries every CORS header this crate sets.
#[must_use]
pub fn has_cors_headers(headers: &HeaderMap) -> bool {
    [
        ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        ACCESS_CONTROL_MAX_AGE,
    ]
    .iter()
    .all(|name| headers.contains_key(name))
}
