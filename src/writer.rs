//! Write-once transport sink.

use http::{HeaderMap, StatusCode};

use crate::error::Error;
use crate::response::{IntoResponse, Response};

/// The transport side of one invocation.
///
/// The engine owns the writer for the whole invocation and commits at most
/// one response to it: one status, one header set, one body. A second
/// [`commit`](Writer::commit) is refused with [`Error::Committed`].
///
/// A writer that was never committed (the request was abandoned) becomes an
/// empty `200 OK` when converted, which is what a transport sends for a
/// handler that wrote nothing. In practice the transport has already gone
/// away, or a [`Timeout`](crate::middleware::Timeout) layer answered instead.
#[derive(Debug, Default)]
pub struct Writer {
    committed: Option<Response>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, response: Response) -> Result<(), Error> {
        if self.committed.is_some() {
            return Err(Error::Committed);
        }
        self.committed = Some(response);
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.committed.as_ref().map(Response::status)
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.committed.as_ref().map(Response::headers)
    }

    /// Committed body bytes; empty when nothing was written.
    pub fn bytes(&self) -> &[u8] {
        self.committed.as_ref().map(Response::bytes).unwrap_or_default()
    }

    pub fn into_response(self) -> Response {
        self.committed.unwrap_or_else(|| Response::new(StatusCode::OK))
    }
}

impl IntoResponse for Writer {
    fn into_response(self) -> Response {
        Writer::into_response(self)
    }
}
