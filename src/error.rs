//! Unified error type.

use thiserror::Error;

/// The error type returned by verdict's fallible operations.
///
/// Handler-level failures (404, 409, etc.) are expressed as
/// [`Exception`](crate::Exception) outcomes, not as `Error`s. This type
/// surfaces infrastructure and input-decoding failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("invalid port: {0}")]
    Port(#[from] std::num::ParseIntError),

    #[error("invalid header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),

    /// The handler asked for decoded input on an invocation that has none.
    #[error("invalid nil pointer")]
    Null,

    /// The writer already carries a response.
    #[error("response already committed")]
    Committed,

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The validator for a shape could not be built from its schema.
    #[error("schema: {0}")]
    Schema(String),

    #[error("{} validation violation(s): {}", .0.len(), .0.join("; "))]
    Violations(Vec<String>),

    #[error("logging: {0}")]
    Logging(String),
}
