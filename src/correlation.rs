//! Correlation id resolution and propagation.
//!
//! Every inbound request gets an identifier: the caller's `X-Correlation-ID`
//! header when present, otherwise a fresh UUID v4. The id is:
//! - stored in the request extensions for handlers ([`CorrelationId`] extractor)
//! - recorded on the request span so every log line carries it
//! - echoed back in the response headers, byte for byte when caller-supplied

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::fmt;
use tracing::Instrument;
use uuid::Uuid;

/// The HTTP header carrying the correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Opaque request-scoped identifier used for cross-service tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

/// The caller's header value, unless it is blank.
fn supplied(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers
        .get(CORRELATION_ID_HEADER)
        .filter(|v| !String::from_utf8_lossy(v.as_bytes()).trim().is_empty())
}

impl CorrelationId {
    /// Reuses the caller-supplied id, or generates a new one.
    ///
    /// Non-UTF-8 header bytes are decoded lossily; the response header still
    /// echoes the original bytes.
    pub fn resolve(headers: &HeaderMap) -> Self {
        supplied(headers).map_or_else(Self::generate, |v| {
            Self(String::from_utf8_lossy(v.as_bytes()).into_owned())
        })
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware resolving the correlation id and scoping the request under a span.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::resolve(request.headers());
    let echoed = supplied(request.headers()).cloned();
    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    match echoed {
        Some(value) => {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }
        None => {
            if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
        }
    }

    response
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Falls back to the headers when the middleware is not mounted.
        Ok(parts
            .extensions
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(|| CorrelationId::resolve(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_supplied_header_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, HeaderValue::from_static("order-42"));
        assert_eq!(CorrelationId::resolve(&headers).as_str(), "order-42");
    }

    #[test]
    fn generates_uuid_when_missing_or_blank() {
        let generated = CorrelationId::resolve(&HeaderMap::new());
        assert!(Uuid::parse_str(generated.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, HeaderValue::from_static("  "));
        let generated = CorrelationId::resolve(&headers);
        assert!(Uuid::parse_str(generated.as_str()).is_ok());
    }

    #[test]
    fn keeps_non_utf8_header_instead_of_regenerating() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CORRELATION_ID_HEADER,
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        let resolved = CorrelationId::resolve(&headers);
        assert_eq!(resolved.as_str(), "caf\u{FFFD}");
        assert_eq!(supplied(&headers).unwrap().as_bytes(), b"caf\xe9");
    }

    #[test]
    fn generated_ids_differ_per_request() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }
}
