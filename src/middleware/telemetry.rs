use tracing::{Instrument, debug, info_span, trace};

use super::{Layer, ServerName, Service};
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

const ENABLED: &str = "enabled";

/// Instruments the rest of the chain with one span per request.
///
/// The span is named `<server>-<service>` from the scope, so place this
/// layer inside [`ServerName`] and [`Service`]. Health probes on `/health`
/// are passed through uninstrumented.
#[derive(Clone, Copy, Debug, Default)]
pub struct Telemetry;

impl Telemetry {
    pub fn value(scope: &Scope) -> Option<&str> {
        scope.get::<&'static str>(keys().telemetry()).copied()
    }
}

impl Layer for Telemetry {
    fn wrap(&self, next: Chain) -> Chain {
        Chain::new(move |req: Request| {
            let next = next.clone();
            async move {
                trace!(key = %keys().telemetry(), value = ENABLED, "middleware");

                let server = ServerName::value(req.scope()).unwrap_or_default();
                let service = Service::value(req.scope()).unwrap_or_default();
                let name = format!("{server}-{service}");

                let req = req.with_value(keys().telemetry(), ENABLED);
                if req.path() == "/health" {
                    debug!(filter = true, "health telemetry exclusion");
                    return next.call(req).await;
                }

                let span = info_span!(
                    "request",
                    server.name = %name,
                    method = %req.method(),
                    path = req.path(),
                    status = tracing::field::Empty,
                );

                let response = next.call(req).instrument(span.clone()).await;
                span.record("status", response.status().as_u16());
                response
            }
        })
    }
}
