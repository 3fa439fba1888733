use axum::http::HeaderValue;

use super::*;

#[test]
fn secrets_match_requires_exact_value() {
    assert!(secrets_match("hunter2", "hunter2"));
    assert!(!secrets_match("hunter3", "hunter2"));
    assert!(!secrets_match("", "hunter2"));
}

#[test]
fn presented_secret_prefers_custom_header() {
    let mut headers = HeaderMap::new();
    headers.insert(SECRET_HEADER, HeaderValue::from_static(" from-header "));
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
    assert_eq!(presented_secret(&headers), Some("from-header"));
}

#[test]
fn presented_secret_reads_bearer_token() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
    assert_eq!(presented_secret(&headers), Some("abc123"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
    assert_eq!(presented_secret(&headers), None);
}
