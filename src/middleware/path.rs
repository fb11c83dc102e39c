use tracing::trace;

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

/// Binds the request path.
#[derive(Clone, Copy, Debug, Default)]
pub struct Path;

impl Path {
    pub fn value(scope: &Scope) -> Option<&str> {
        scope.get::<String>(keys().path()).map(String::as_str)
    }
}

impl Layer for Path {
    fn wrap(&self, next: Chain) -> Chain {
        Chain::new(move |req: Request| {
            let next = next.clone();
            async move {
                let path = req.path().to_owned();
                trace!(key = %keys().path(), value = %path, "middleware");
                next.call(req.with_value(keys().path(), path)).await
            }
        })
    }
}
