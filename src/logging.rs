//! Process-wide log subscriber.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::error::Error;

/// Output format of the installed subscriber.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// Human-readable lines, for local development.
    #[default]
    Pretty,
    /// One JSON object per event, for log collectors.
    Json,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::Logging(format!("unknown log format {other:?}"))),
        }
    }
}

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Fails with
/// [`Error::Logging`] when a global subscriber is already installed.
pub fn init(format: Format) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        Format::Pretty => builder.try_init(),
        Format::Json => builder.json().with_current_span(true).try_init(),
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}
