//! Transport handlers and type erasure.
//!
//! # How async handlers are stored
//!
//! Middleware wraps handlers of *different* concrete types around each other,
//! so every layer needs one uniform type to hold and call. We hide the
//! concrete type behind a trait object (`dyn ErasedHandler`) and share it
//! through an `Arc`:
//!
//! ```text
//! async fn users(req: Request) -> Response { … }   ← user writes this
//!        ↓ Chain::new(users)
//! users.into_chain()                               ← Handler blanket impl
//!        ↓
//! Chain(Arc::new(FnHandler(users)))                ← heap-allocated wrapper
//!        ↓  decorators take a Chain and return a Chain
//! chain.call(req)  at request time                 ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { users(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! Cloning a [`Chain`] is one atomic increment, so decorators clone their
//! `next` freely inside per-request closures.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because [`Chain`] wraps it
/// and `Chain` is public.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// A type-erased handler, possibly already wrapped in middleware.
///
/// This is what decorators consume and produce, and what
/// [`Server::serve`](crate::Server::serve) runs.
#[derive(Clone)]
pub struct Chain(Arc<dyn ErasedHandler + Send + Sync + 'static>);

impl Chain {
    pub fn new(handler: impl Handler) -> Self {
        handler.into_chain()
    }

    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }

    /// `true` when both chains are the very same handler instance.
    pub fn ptr_eq(a: &Chain, b: &Chain) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Chain")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid transport handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by [`Chain`] itself. The trait is **sealed** (via the private `Sealed`
/// supertrait) so the set of implementors stays under this crate's control.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_chain(self) -> Chain;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_chain(self) -> Chain {
        Chain(Arc::new(FnHandler(self)))
    }
}

impl private::Sealed for Chain {}

impl Handler for Chain {
    fn into_chain(self) -> Chain {
        self
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
