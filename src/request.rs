//! Incoming HTTP request type.

use std::any::Any;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use tokio_util::sync::CancellationToken;

use crate::keystore::{Key, Scope};

/// An incoming HTTP request with its body already buffered.
///
/// Besides the usual method, URI, headers and body, every request carries:
///
/// - a [`Scope`] of request-scoped values attached by middleware, and
/// - a [`CancellationToken`] that fires when the request is abandoned
///   (client disconnect, deadline).
///
/// Cloning is cheap: the body is a ref-counted [`Bytes`] and the scope is a
/// shared immutable list.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    scope: Scope,
    token: CancellationToken,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            scope: Scope::new(),
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn scope(&self) -> &Scope { &self.scope }
    pub fn token(&self) -> &CancellationToken { &self.token }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the request with `key` bound to `value` in a child scope.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(mut self, key: Key, value: T) -> Self {
        self.scope = self.scope.with(key, value);
        self
    }

    /// Replaces the cancellation token, typically with a child of the current one.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }
}

/// `GET /` with no headers and no body.
impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new())
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
