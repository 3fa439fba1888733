//! Shared-secret gate for API routes.
//!
//! When `CANVAS_SHARED_SECRET` is set, every `/api` request must carry it in
//! `x-canvas-secret` or as an `Authorization: Bearer` token. Unset means the
//! server is open, which is the local-development default.

use axum::Json;
use axum::extract::FromRef;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::ErrorBody;
use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-canvas-secret";

/// Proof that the request passed the shared-secret check.
#[derive(Debug, Clone, Copy)]
pub struct SharedSecret;

impl<S> axum::extract::FromRequestParts<S> for SharedSecret
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Some(expected) = app_state.config.shared_secret.as_deref() else {
            return Ok(Self);
        };

        match presented_secret(&parts.headers) {
            Some(presented) if secrets_match(presented, expected) => Ok(Self),
            presented => {
                warn!(path = %parts.uri.path(), presented = presented.is_some(), "auth: shared secret rejected");
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorBody {
                        code: "E_UNAUTHORIZED",
                        message: "missing or invalid shared secret".into(),
                        retryable: false,
                    }),
                ))
            }
        }
    }
}

fn presented_secret(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.trim());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare digests so the comparison length never depends on the input.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
