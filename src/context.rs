//! The handler's view of one invocation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::HeaderMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::keystore::Scope;
use crate::outcome::{Exception, Redirect, Success};
use crate::request::Request;

/// What a handler hands back to the engine. `None` payloads are engine faults.
pub(crate) enum Signal {
    Complete(Option<Success>),
    Redirect(Option<Redirect>),
    Error(Exception),
}

impl Signal {
    fn kind(&self) -> &'static str {
        match self {
            Self::Complete(_) => "complete",
            Self::Redirect(_) => "redirect",
            Self::Error(_) => "error",
        }
    }
}

struct Inner<I> {
    request: Request,
    input: Option<I>,
    headers: Arc<Mutex<HeaderMap>>,
    endpoint: Mutex<Option<oneshot::Sender<Signal>>>,
}

/// Execution context passed to an engine handler.
///
/// A handler finishes by calling exactly one of [`complete`](Context::complete),
/// [`redirect`](Context::redirect) or [`error`](Context::error), then returns.
/// The first call wins; any later call is dropped and logged at `warn`.
///
/// The context is cheap to clone, so nested tasks spawned by the handler may
/// carry it and deliver the outcome themselves. The engine learns that no
/// outcome is coming only once every clone is gone.
pub struct Context<I = ()> {
    inner: Arc<Inner<I>>,
}

impl<I> Clone for Context<I> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<I> Context<I> {
    pub(crate) fn new(
        request: Request,
        input: Option<I>,
        headers: Arc<Mutex<HeaderMap>>,
        endpoint: oneshot::Sender<Signal>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                request,
                input,
                headers,
                endpoint: Mutex::new(Some(endpoint)),
            }),
        }
    }

    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    pub fn scope(&self) -> &Scope {
        self.inner.request.scope()
    }

    /// The decoded input. Fails with [`Error::Null`] when the invocation was
    /// not started through [`validate`](crate::validate).
    pub fn input(&self) -> Result<&I, Error> {
        self.inner.input.as_ref().ok_or(Error::Null)
    }

    /// Headers to send with the terminal response. Anything set here before
    /// the outcome is emitted is kept, except headers the renderer itself
    /// owns (such as `content-type`).
    ///
    /// Drop the guard before awaiting anything.
    pub fn headers(&self) -> MutexGuard<'_, HeaderMap> {
        self.inner.headers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> &CancellationToken {
        self.inner.request.token()
    }

    /// Resolves once the request is abandoned. Long-running handlers should
    /// race their work against this and stop early.
    pub async fn cancelled(&self) {
        self.token().cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.token().is_cancelled()
    }

    /// Finish with a success response. Returns `false` if the outcome was not
    /// delivered (another outcome came first, or the request was abandoned).
    pub fn complete(&self, success: impl Into<Option<Success>>) -> bool {
        self.emit(Signal::Complete(success.into()))
    }

    pub fn redirect(&self, redirect: impl Into<Option<Redirect>>) -> bool {
        self.emit(Signal::Redirect(redirect.into()))
    }

    pub fn error(&self, exception: Exception) -> bool {
        self.emit(Signal::Error(exception))
    }

    fn emit(&self, signal: Signal) -> bool {
        let endpoint = self
            .inner
            .endpoint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let kind = signal.kind();
        let path = self.request().path();

        match endpoint {
            Some(endpoint) => {
                if endpoint.send(signal).is_err() {
                    debug!(path, kind, "outcome discarded, request already abandoned");
                    return false;
                }
                true
            }
            None => {
                warn!(path, kind, "duplicate outcome ignored");
                false
            }
        }
    }
}
