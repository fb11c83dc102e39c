//! The execution engine: run a handler, resolve exactly one outcome.
//!
//! # Protocol
//!
//! ```text
//! Idle ──decode/validate──▶ Rejected                      (handler never runs)
//!   │
//!   └──spawn handler──▶ Dispatched ──first of──┬─ cancelled      ▶ Cancelled  (no write)
//!                                              ├─ complete(..)   ▶ Completed
//!                                              ├─ redirect(..)   ▶ Redirected
//!                                              ├─ error(..)      ▶ Failed
//!                                              └─ missing value,
//!                                                 no outcome     ▶ Faulted    (500)
//! ```
//!
//! The handler runs on its own task and talks to the engine through a single
//! one-shot endpoint held by its [`Context`]. The engine owns the [`Writer`]
//! outright, so the handler has no way to write to the transport, and the
//! engine commits to it at most once.
//!
//! Cancellation is checked first whenever both events are ready. Once it is
//! observed the engine returns without writing, even if the handler's
//! outcome is already in flight: the transport (or the layer that cancelled)
//! owns the reply from then on. Cancellation is cooperative; the handler task
//! keeps running until it notices [`Context::cancelled`].

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use http::{HeaderMap, StatusCode};
use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, trace, warn};

use crate::context::{Context, Signal};
use crate::outcome::{Exception, Outcome};
use crate::request::Request;
use crate::response::Response;
use crate::validation::{self, Shape};
use crate::writer::Writer;

/// How an invocation ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminal {
    Completed,
    Redirected,
    Rejected,
    Failed,
    Cancelled,
    /// The handler broke the protocol (missing payload, no outcome at all);
    /// answered with a generic `500`.
    Faulted,
}

impl Terminal {
    /// `true` unless the invocation was abandoned.
    pub fn wrote(self) -> bool {
        self != Self::Cancelled
    }
}

/// Runs `handle` for `request` and commits its outcome to `writer`.
///
/// ```rust,no_run
/// use http::StatusCode;
/// use verdict::{Context, Request, Success, Writer};
///
/// async fn ping(req: Request) -> Writer {
///     let mut writer = Writer::new();
///     verdict::process(req, &mut writer, |ctx: Context| async move {
///         ctx.complete(Success::new(StatusCode::OK, "pong"));
///     })
///     .await;
///     writer
/// }
/// ```
pub async fn process<H, Fut>(request: Request, writer: &mut Writer, handle: H) -> Terminal
where
    H: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    dispatch(request, None, writer, handle).await
}

/// Like [`process`], but first decodes the body as `T`.
///
/// Input that does not decode or validate is answered right here and the
/// handler never runs. Otherwise the handler reads the input through
/// [`Context::input`].
pub async fn validate<T, H, Fut>(request: Request, writer: &mut Writer, handle: H) -> Terminal
where
    T: Shape,
    H: FnOnce(Context<T>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    match validation::decode::<T>(request.body()) {
        Ok(input) => dispatch(request, Some(input), writer, handle).await,
        Err(invalid) => {
            warn!(
                error = %invalid,
                source = ?invalid.source.as_ref().map(ToString::to_string),
                path = request.path(),
                method = %request.method(),
                "invalid request"
            );
            let outcome = Outcome::Invalid(invalid);
            match outcome.render(request.method()) {
                Ok(response) => {
                    commit(writer, HeaderMap::new(), response);
                    Terminal::Rejected
                }
                Err(e) => fault(writer, &request, HeaderMap::new(), &e.to_string()),
            }
        }
    }
}

async fn dispatch<I, H, Fut>(
    request: Request,
    input: Option<I>,
    writer: &mut Writer,
    handle: H,
) -> Terminal
where
    I: Send + Sync + 'static,
    H: FnOnce(Context<I>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (endpoint, outcome) = oneshot::channel();
    let headers = Arc::new(Mutex::new(HeaderMap::new()));
    let token = request.token().clone();

    let ctx = Context::new(request.clone(), input, Arc::clone(&headers), endpoint);
    tokio::spawn(handle(ctx).in_current_span());

    let signal = tokio::select! {
        biased;

        () = token.cancelled() => {
            debug!(path = request.path(), method = %request.method(), "request cancelled, abandoning");
            return Terminal::Cancelled;
        }

        signal = outcome => signal,
    };

    // Headers are frozen at the moment the outcome arrives.
    let pending = std::mem::take(&mut *headers.lock().unwrap_or_else(PoisonError::into_inner));

    let Ok(signal) = signal else {
        return fault(writer, &request, pending, "handler finished without an outcome");
    };

    let (outcome, terminal) = match signal {
        Signal::Complete(None) => {
            return fault(writer, &request, pending, "complete called without a response");
        }
        Signal::Redirect(None) => {
            return fault(writer, &request, pending, "redirect called without a target");
        }
        Signal::Complete(Some(success)) => {
            if success.payload.is_empty() {
                warn!(path = request.path(), status = success.status.as_u16(), "no content in response");
            }
            debug!(path = request.path(), status = success.status.as_u16(), "request processed");
            (Outcome::Success(success), Terminal::Completed)
        }
        Signal::Redirect(Some(redirect)) => {
            trace!(path = request.path(), target = %redirect.target, status = redirect.status.as_u16(), "redirect processed");
            (Outcome::Redirect(redirect), Terminal::Redirected)
        }
        Signal::Error(exception) => {
            report(&request, &exception);
            (Outcome::Exception(exception), Terminal::Failed)
        }
    };

    let kind = outcome.kind();
    match outcome.render(request.method()) {
        Ok(response) => {
            commit(writer, pending, response);
            terminal
        }
        Err(e) => fault(writer, &request, pending, &format!("unable to render {kind}: {e}")),
    }
}

fn report(request: &Request, exception: &Exception) {
    let source = exception.cause.as_ref().map_or_else(|| "N/A".to_owned(), ToString::to_string);
    error!(
        status = exception.status.as_u16(),
        error = %source,
        public = %exception.message,
        internal = %exception.log,
        metadata = %serde_json::Value::Object(exception.metadata.clone()),
        path = request.path(),
        method = %request.method(),
        "error while processing request"
    );
}

fn fault(writer: &mut Writer, request: &Request, pending: HeaderMap, reason: &str) -> Terminal {
    error!(path = request.path(), method = %request.method(), reason, "engine fault, answering 500");
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    commit(writer, pending, Response::error(status, status.canonical_reason().unwrap_or_default()));
    Terminal::Faulted
}

/// Merges handler-set headers under the renderer's own, then commits.
fn commit(writer: &mut Writer, mut pending: HeaderMap, mut response: Response) {
    pending.extend(std::mem::take(&mut response.headers));
    response.headers = pending;

    if let Err(e) = writer.commit(response) {
        error!(error = %e, "unable to write response");
    }
}
