//! Middleware: decorators and the composer that stacks them.
//!
//! A decorator takes the rest of the chain and returns a new chain that runs
//! its own code around it. [`Middlewares`] collects decorators and wraps a
//! terminal handler with them in one deterministic pass.
//!
//! # Order
//!
//! The first decorator added sits closest to the terminal handler; the last
//! one added sees the request first and the response last:
//!
//! ```text
//! stack.add([A, B]).handler(terminal)
//!
//!   request ─▶ B ─▶ A ─▶ terminal ─▶ A ─▶ B ─▶ response
//! ```
//!
//! # Built-in layers
//!
//! Each built-in layer binds one slot of the [keystore](crate::keystore) in
//! a child scope, so everything downstream can read it and nothing upstream
//! can. Each also exposes a `value(scope)` accessor for the slot it fills.

use std::fmt;
use std::sync::Arc;

use crate::handler::{Chain, Handler};

mod envoy;
mod path;
mod server;
mod service;
mod state;
mod telemetry;
mod timeout;
mod tracer;
mod version;

pub use envoy::{Envoy, EnvoyMetadata};
pub use path::Path;
pub use server::ServerName;
pub use service::Service;
pub use state::State;
pub use telemetry::Telemetry;
pub use timeout::Timeout;
pub use tracer::{Tracer, Tracing};
pub use version::{Version, Versioning};

// ── Layer ─────────────────────────────────────────────────────────────────────

/// A reusable decorator with configuration.
///
/// Implement this for middleware that carries settings; any `Layer` converts
/// into a [`Decorator`] and can be handed to [`Middlewares::add`].
pub trait Layer: Send + Sync + 'static {
    fn wrap(&self, next: Chain) -> Chain;
}

// ── Decorator ─────────────────────────────────────────────────────────────────

/// A type-erased `Chain -> Chain` function.
#[derive(Clone)]
pub struct Decorator(Arc<dyn Fn(Chain) -> Chain + Send + Sync + 'static>);

impl Decorator {
    /// Wraps a plain function or closure.
    ///
    /// ```rust
    /// use verdict::middleware::Decorator;
    /// use verdict::{Chain, Request};
    ///
    /// let noisy = Decorator::new(|next: Chain| {
    ///     Chain::new(move |req: Request| {
    ///         let next = next.clone();
    ///         async move {
    ///             tracing::info!(path = req.path(), "before");
    ///             next.call(req).await
    ///         }
    ///     })
    /// });
    /// ```
    pub fn new<F>(decorate: F) -> Self
    where
        F: Fn(Chain) -> Chain + Send + Sync + 'static,
    {
        Self(Arc::new(decorate))
    }

    pub fn apply(&self, next: Chain) -> Chain {
        (self.0)(next)
    }
}

impl<L: Layer> From<L> for Decorator {
    fn from(layer: L) -> Self {
        Self::new(move |next| layer.wrap(next))
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decorator")
    }
}

// ── Composer ──────────────────────────────────────────────────────────────────

/// An ordered stack of decorators.
#[derive(Clone, Debug, Default)]
pub struct Middlewares {
    stack: Vec<Decorator>,
}

impl Middlewares {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends decorators in order. An empty input changes nothing.
    pub fn add<I, D>(&mut self, decorators: I) -> &mut Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Decorator>,
    {
        self.stack.extend(decorators.into_iter().map(Into::into));
        self
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Wraps `terminal` with every decorator, first-added innermost.
    ///
    /// With no decorators the terminal comes back as is.
    pub fn handler(&self, terminal: impl Handler) -> Chain {
        self.stack
            .iter()
            .fold(Chain::new(terminal), |next, decorator| decorator.apply(next))
    }
}
