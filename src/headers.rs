//! Propagation of tracing and identity headers to outbound responses.

use http::HeaderMap;

/// Headers copied from an upstream response, when present and non-empty.
pub const PROPAGATED: [&str; 12] = [
    "portal",
    "device",
    "user",
    "travel",
    "x-request-id",
    "x-b3-traceid",
    "x-b3-spanid",
    "x-b3-parentspanid",
    "x-b3-sampled",
    "x-b3-flags",
    "x-ot-span-context",
    "x-api-version",
];

/// Copies every [`PROPAGATED`] header from `upstream` into `outbound`,
/// replacing what `outbound` had for that name.
pub fn propagate(upstream: &HeaderMap, outbound: &mut HeaderMap) {
    for name in PROPAGATED {
        if let Some(value) = upstream.get(name).filter(|v| !v.is_empty()) {
            outbound.insert(name, value.clone());
        }
    }
}
