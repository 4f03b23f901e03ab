//! Per-request session and origin.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use common::SessionId;

/// Header carrying the cart session.
pub const SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Who is calling: the cart session and the client address recorded in
/// the operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub session: SessionId,
    pub origin: String,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let session = headers
            .get(&SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(SessionId::from)
            .filter(|s| !s.is_blank())
            .unwrap_or_else(SessionId::generate);

        Self {
            session,
            origin: client_origin(headers),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<RequestContext>() {
            return Ok(context.clone());
        }
        Ok(Self::from_headers(&parts.headers))
    }
}

/// First `x-forwarded-for` entry, else `x-real-ip`, else `unknown`.
pub fn client_origin(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for")
        && let Some(first) = forwarded.split(',').next().map(str::trim)
        && !first.is_empty()
    {
        return first.to_owned();
    }
    header("x-real-ip")
        .map(str::to_owned)
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Resolves the request context once and echoes the session id back, so a
/// client that sent none learns the one generated for it.
pub async fn session_middleware(mut req: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(req.headers());
    let session = HeaderValue::from_str(context.session.as_str()).ok();
    req.extensions_mut().insert(context);

    let mut response = next.run(req).await;
    if let Some(value) = session {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
