use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::router::AppState;

/// Ensure the inbound request carries the journal key.
/// Accepts either:
/// - Header: `x-journal-key: ...`
/// - Header: `Authorization: Bearer ...`
/// - Query string: `?key=...`
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<(), Response> {
    let matches = |candidate: &str| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()));

    // 1) header: x-journal-key
    if let Some(hv) = headers.get("x-journal-key").and_then(|v| v.to_str().ok())
        && matches(hv)
    {
        return Ok(());
    }

    // 2) header: Authorization: Bearer <key>
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && matches(token)
        {
            return Ok(());
        }
    }

    // 3) query: key=...
    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && matches(&v) {
                return Ok(());
            }
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": "UNAUTHORIZED", "message": "invalid or missing journal key"}})),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl FromRequestParts<AppState> for RequireKeyAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, parts.uri.query(), &state.journal_key)?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accepts_each_key_location() {
        let mut headers = HeaderMap::new();
        headers.insert("x-journal-key", HeaderValue::from_static("pwd"));
        assert!(ensure_authorized(&headers, None, "pwd").is_ok());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer pwd"));
        assert!(ensure_authorized(&headers, None, "pwd").is_ok());

        assert!(ensure_authorized(&HeaderMap::new(), Some("q=x&key=pwd"), "pwd").is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-journal-key", HeaderValue::from_static("pw"));
        let err = ensure_authorized(&headers, Some("key=nope"), "pwd").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(ensure_authorized(&HeaderMap::new(), None, "pwd").is_err());
    }
}
