use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

/// Binds shared application state (database pools, clients, settings).
///
/// ```rust
/// use verdict::middleware::State;
///
/// struct Pool;
///
/// let layer = State::new(Pool);
/// ```
///
/// Handlers read it back with `State::<Pool>::value(ctx.scope())`.
pub struct State<S> {
    state: Arc<S>,
}

impl<S: Send + Sync + 'static> State<S> {
    pub fn new(state: S) -> Self {
        Self { state: Arc::new(state) }
    }

    pub fn shared(state: Arc<S>) -> Self {
        Self { state }
    }

    pub fn value(scope: &Scope) -> Option<Arc<S>> {
        scope.get::<Arc<S>>(keys().state()).cloned()
    }
}

impl<S> Clone for State<S> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<S> fmt::Debug for State<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("type", &type_name::<S>()).finish()
    }
}

impl<S: Send + Sync + 'static> Layer for State<S> {
    fn wrap(&self, next: Chain) -> Chain {
        let state = Arc::clone(&self.state);
        Chain::new(move |req: Request| {
            let next = next.clone();
            let state = Arc::clone(&state);
            async move {
                trace!(key = %keys().state(), value = type_name::<S>(), "middleware");
                next.call(req.with_value(keys().state(), state)).await
            }
        })
    }
}
