//! Hardened `set-cookie` writer.

use chrono::{DateTime, TimeDelta, Utc};
use http::HeaderMap;
use http::header::{HeaderValue, SET_COOKIE};
use tracing::trace;

use crate::config::Environment;
use crate::error::Error;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const MAX_AGE: i64 = 86_400;

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Only sent in deployed environments; CI and development hosts get a
    /// host-only cookie.
    pub domain: Option<String>,
}

/// Appends a secure `set-cookie` header: path `/`, three-hour expiry, one-day
/// max-age, `Secure`, `HttpOnly`, `SameSite=Strict`.
pub fn secure(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    options: &Options,
    environment: Environment,
) -> Result<(), Error> {
    let cookie = render(name, value, options, environment, Utc::now());
    headers.append(SET_COOKIE, HeaderValue::try_from(cookie)?);
    trace!(name, "cookie set");
    Ok(())
}

fn render(
    name: &str,
    value: &str,
    options: &Options,
    environment: Environment,
    now: DateTime<Utc>,
) -> String {
    let expires = (now + TimeDelta::hours(3)).format(HTTP_DATE);
    let mut cookie = format!("{name}={value}; Path=/");

    if environment == Environment::Deployed
        && let Some(domain) = options.domain.as_deref().filter(|d| !d.is_empty())
    {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }

    cookie.push_str(&format!(
        "; Expires={expires}; Max-Age={MAX_AGE}; HttpOnly; Secure; SameSite=Strict"
    ));
    cookie
}
