use http::header::{HeaderValue, SERVER};
use tracing::{trace, warn};

use super::Layer;
use crate::handler::Chain;
use crate::keystore::{Scope, keys};
use crate::request::Request;

/// Binds the server name and advertises it in the `server` response header.
///
/// A `server` header the handler set itself is left alone.
#[derive(Clone, Debug)]
pub struct ServerName {
    name: String,
}

impl ServerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn value(scope: &Scope) -> Option<&str> {
        scope.get::<String>(keys().server()).map(String::as_str)
    }
}

impl Layer for ServerName {
    fn wrap(&self, next: Chain) -> Chain {
        let name = self.name.clone();
        let header = HeaderValue::try_from(name.as_str());
        if header.is_err() {
            warn!(server = %name, "server name is not a valid header value, header disabled");
        }
        let header = header.ok();

        Chain::new(move |req: Request| {
            let next = next.clone();
            let name = name.clone();
            let header = header.clone();
            async move {
                trace!(key = %keys().server(), value = %name, "middleware");
                let mut response = next.call(req.with_value(keys().server(), name)).await;
                if let Some(header) = header {
                    response.headers_mut().entry(SERVER).or_insert(header);
                }
                response
            }
        })
    }
}
