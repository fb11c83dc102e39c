use tracing::trace;

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

/// Binds the service name.
#[derive(Clone, Debug)]
pub struct Service {
    name: String,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn value(scope: &Scope) -> Option<&str> {
        scope.get::<String>(keys().service()).map(String::as_str)
    }
}

impl Layer for Service {
    fn wrap(&self, next: Chain) -> Chain {
        let name = self.name.clone();
        Chain::new(move |req: Request| {
            let next = next.clone();
            let name = name.clone();
            async move {
                trace!(key = %keys().service(), value = %name, "middleware");
                next.call(req.with_value(keys().service(), name)).await
            }
        })
    }
}
