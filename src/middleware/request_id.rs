use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, stored in request extensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reuses a well-formed incoming id so client and server logs line up
    fn from_request(request: &Request) -> Self {
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId)
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tags every request with a `RequestId` and echoes it in the `x-request-id`
/// response header
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_request(&request);
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// `TraceLayer` span carrying the request id
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_id_is_reused() {
        let id = Uuid::new_v4();
        let request = axum::http::Request::builder()
            .header(REQUEST_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();
        assert_eq!(RequestId::from_request(&request), RequestId(id));
    }

    #[test]
    fn test_malformed_id_is_replaced() {
        let request = axum::http::Request::builder()
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();
        assert_ne!(RequestId::from_request(&request).to_string(), "not-a-uuid");
    }
}
