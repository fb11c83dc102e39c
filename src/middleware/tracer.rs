use tracing::{Span, info_span, trace};

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

/// A named span factory handed to handlers, so nested work can open child
/// spans attributed to the same instrumentation scope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tracer {
    name: String,
}

impl Tracer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opens a span for `operation`, parented to the current span.
    pub fn span(&self, operation: &str) -> Span {
        info_span!("operation", tracer = %self.name, operation)
    }
}

/// Binds a [`Tracer`].
#[derive(Clone, Debug)]
pub struct Tracing {
    tracer: Tracer,
}

impl Tracing {
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }

    pub fn value(scope: &Scope) -> Option<&Tracer> {
        scope.get(keys().tracer())
    }
}

impl Layer for Tracing {
    fn wrap(&self, next: Chain) -> Chain {
        let tracer = self.tracer.clone();
        Chain::new(move |req: Request| {
            let next = next.clone();
            let tracer = tracer.clone();
            async move {
                trace!(key = %keys().tracer(), value = tracer.name(), "middleware");
                next.call(req.with_value(keys().tracer(), tracer)).await
            }
        })
    }
}
