use http::header::{HeaderName, HeaderValue};
use serde::Serialize;
use tracing::trace;

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

const SERVICE_VERSION: HeaderName = HeaderName::from_static("x-service-version");
const API_VERSION: HeaderName = HeaderName::from_static("x-api-version");

/// The running service's version.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Version {
    pub service: String,
}

impl Default for Version {
    fn default() -> Self {
        Self { service: "development".to_owned() }
    }
}

/// Binds a [`Version`], sets `x-service-version` on the response and echoes
/// the caller's `x-api-version` back.
#[derive(Clone, Debug, Default)]
pub struct Versioning {
    version: Version,
}

impl Versioning {
    pub fn new(service: impl Into<String>) -> Self {
        Self { version: Version { service: service.into() } }
    }

    /// The bound version, or `development` when no layer bound one.
    pub fn value(scope: &Scope) -> Version {
        scope.get::<Version>(keys().version()).cloned().unwrap_or_default()
    }
}

impl Layer for Versioning {
    fn wrap(&self, next: Chain) -> Chain {
        let version = self.version.clone();
        let header = HeaderValue::try_from(version.service.as_str()).ok();

        Chain::new(move |req: Request| {
            let next = next.clone();
            let version = version.clone();
            let header = header.clone();
            async move {
                trace!(key = %keys().version(), service = %version.service, "middleware");

                let api = req.headers().get(&API_VERSION).filter(|v| !v.is_empty()).cloned();
                let mut response = next.call(req.with_value(keys().version(), version)).await;

                let headers = response.headers_mut();
                if let Some(header) = header {
                    headers.entry(SERVICE_VERSION).or_insert(header);
                }
                if let Some(api) = api {
                    headers.entry(API_VERSION).or_insert(api);
                }
                response
            }
        })
    }
}
