use std::time::Duration;

use http::StatusCode;
use tracing::{trace, warn};

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;
use crate::response::Response;

/// Bounds how long the rest of the chain may take.
///
/// The inner chain runs under a child of the request's cancellation token.
/// When the deadline passes first, the token is cancelled (so an engine
/// downstream abandons the invocation without writing) and this layer
/// answers `503 Service Unavailable` itself.
#[derive(Clone, Copy, Debug)]
pub struct Timeout {
    deadline: Duration,
}

impl Timeout {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn value(scope: &Scope) -> Option<Duration> {
        scope.get::<Duration>(keys().timeout()).copied()
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Layer for Timeout {
    fn wrap(&self, next: Chain) -> Chain {
        let deadline = self.deadline;
        Chain::new(move |req: Request| {
            let next = next.clone();
            async move {
                trace!(key = %keys().timeout(), value = ?deadline, "middleware");

                let token = req.token().child_token();
                let path = req.path().to_owned();
                let req = req.with_token(token.clone()).with_value(keys().timeout(), deadline);

                tokio::select! {
                    response = next.call(req) => response,
                    () = tokio::time::sleep(deadline) => {
                        token.cancel();
                        warn!(path, deadline = ?deadline, "request timed out");
                        let status = StatusCode::SERVICE_UNAVAILABLE;
                        Response::error(status, status.canonical_reason().unwrap_or_default())
                    }
                }
            }
        })
    }
}
