//! Shared utility functions.

use axum::http::HeaderMap;

/// Extract the client IP address from request headers.
///
/// Tries `x-forwarded-for` first (for proxied requests), then
/// `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
}
