use axum::http::HeaderMap;

pub mod response_envelope;
pub mod sse;

/// Header used to correlate client requests with server logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller-supplied request id, `-` when absent.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("-")
}
