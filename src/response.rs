//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers driven by the [engine](crate::process) never build a [`Response`]
//! themselves; they emit an outcome and the engine renders it. Middleware and
//! plain transport handlers work with `Response` directly.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values the outcome renderers emit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,  // text/html; charset=utf-8
    Json,  // application/json
    Plain, // text/plain
    Text,  // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html  => "text/html; charset=utf-8",
            Self::Json  => "application/json",
            Self::Plain => "text/plain",
            Self::Text  => "text/plain; charset=utf-8",
        }
    }

    fn header(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use verdict::{ContentType, Response};
///
/// Response::json(StatusCode::CREATED, br#"{"id":42}"#.to_vec());
/// Response::error(StatusCode::NOT_FOUND, "(404) Not Found");
/// Response::body(StatusCode::OK, ContentType::Plain, "pong");
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Response {
    /// Response with no body.
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Response with a typed body.
    pub fn body(status: StatusCode, content_type: ContentType, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type.header());
        Self { status, headers, body: body.into() }
    }

    /// `application/json` — pass bytes straight from your serialiser.
    pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::body(status, ContentType::Json, body)
    }

    /// Plain-text error reply: `text/plain; charset=utf-8` plus
    /// `x-content-type-options: nosniff`, so browsers never sniff the
    /// message into something executable.
    pub fn error(status: StatusCode, text: impl Into<String>) -> Self {
        let text: String = text.into();
        let mut response = Self::body(status, ContentType::Text, text);
        response.headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        response
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn bytes(&self) -> &[u8] { &self.body }

    /// Converts into the hyper-facing response type.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::body(StatusCode::OK, ContentType::Text, self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::body(StatusCode::OK, ContentType::Text, self) }
}

/// Return a bare status from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::new(self) }
}
