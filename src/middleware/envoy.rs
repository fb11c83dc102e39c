use serde::Serialize;
use tracing::trace;

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

/// What the Envoy sidecar told us about this request. Absent or unparsable
/// headers read as `None`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EnvoyMetadata {
    #[serde(rename = "x-envoy-attempt-count")]
    pub attempts: Option<u32>,
    #[serde(rename = "x-envoy-original-path")]
    pub original: Option<String>,
    #[serde(rename = "x-envoy-internal")]
    pub internal: Option<bool>,
}

impl EnvoyMetadata {
    pub fn from_request(req: &Request) -> Self {
        let header = |name: &'static str| req.header(name).filter(|v| !v.is_empty());

        Self {
            attempts: header("x-envoy-request-count").and_then(|v| v.parse().ok()),
            original: header("x-envoy-original-path").map(str::to_owned),
            internal: header("x-envoy-internal").filter(|v| *v == "true").map(|_| true),
        }
    }
}

/// Binds the [`EnvoyMetadata`] parsed from the request headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Envoy;

impl Envoy {
    pub fn value(scope: &Scope) -> Option<&EnvoyMetadata> {
        scope.get(keys().envoy())
    }
}

impl Layer for Envoy {
    fn wrap(&self, next: Chain) -> Chain {
        Chain::new(move |req: Request| {
            let next = next.clone();
            async move {
                let metadata = EnvoyMetadata::from_request(&req);
                trace!(key = %keys().envoy(), value = ?metadata, "middleware");
                next.call(req.with_value(keys().envoy(), metadata)).await
            }
        })
    }
}
