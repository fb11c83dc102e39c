//! The four terminal outcomes of an invocation and how each one renders.
//!
//! Outcomes are plain data. Rendering is pure: it turns an outcome into a
//! [`Response`] and never touches a transport. Only the engine commits the
//! result to a [`Writer`](crate::Writer).

use std::error::Error as StdError;
use std::fmt;

use bytes::Bytes;
use http::header::{HeaderValue, LOCATION};
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::response::{ContentType, Response};
use crate::validation::{INTERNAL_VALIDATION_ERROR, Validators};

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// A success body, tagged by the producer.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Rendered as `text/plain`.
    Text(String),
    /// Rendered as `text/plain`, bytes untouched.
    Bytes(Bytes),
    /// Rendered as `application/json`.
    Structured(Value),
}

impl Payload {
    /// Text or bytes with nothing in them. Structured values are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Structured(_) => false,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self { Self::Text(text) }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self { Self::Text(text.to_owned()) }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self { Self::Bytes(bytes) }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self { Self::Bytes(bytes.into()) }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self { Self::Structured(value) }
}

// ── Success ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Success {
    pub status: StatusCode,
    pub payload: Payload,
}

impl Success {
    pub fn new(status: StatusCode, payload: impl Into<Payload>) -> Self {
        Self { status, payload: payload.into() }
    }

    /// Serialises `value` into a structured payload.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, Error> {
        Ok(Self::new(status, serde_json::to_value(value)?))
    }

    /// Text and bytes go out as `text/plain`. An empty text body is replaced
    /// by the "No Content" reason phrase; the declared status is kept because
    /// a real `204` cannot carry a body.
    pub fn render(self) -> Response {
        let status = self.status;
        match self.payload {
            Payload::Text(text) if text.is_empty() => {
                Response::body(status, ContentType::Plain, reason(StatusCode::NO_CONTENT))
            }
            Payload::Bytes(bytes) if bytes.is_empty() => {
                Response::body(status, ContentType::Plain, reason(StatusCode::NO_CONTENT))
            }
            Payload::Text(text) => Response::body(status, ContentType::Plain, text),
            Payload::Bytes(bytes) => Response::body(status, ContentType::Plain, bytes),
            Payload::Structured(value) => match serde_json::to_vec(&value) {
                Ok(body) => Response::json(status, body),
                Err(_) => Response::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    reason(StatusCode::INTERNAL_SERVER_ERROR),
                ),
            },
        }
    }
}

// ── Redirect ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub status: StatusCode,
}

impl Redirect {
    pub fn new(target: impl Into<String>, status: StatusCode) -> Self {
        Self { target: target.into(), status }
    }

    /// `302 Found`.
    pub fn found(target: impl Into<String>) -> Self {
        Self::new(target, StatusCode::FOUND)
    }

    /// `303 See Other`, the usual answer to a form POST.
    pub fn see_other(target: impl Into<String>) -> Self {
        Self::new(target, StatusCode::SEE_OTHER)
    }

    /// Sets `location`. `GET` requests also get a tiny HTML body linking to
    /// the target, for clients that do not follow redirects.
    pub fn render(&self, method: &Method) -> Result<Response, Error> {
        let location = HeaderValue::try_from(self.target.as_str())?;

        let response = if *method == Method::GET {
            let body = format!("<a href=\"{}\">{}</a>.\n", escape(&self.target), reason(self.status));
            Response::body(self.status, ContentType::Html, body)
        } else {
            Response::new(self.status)
        };

        Ok(response.with_header(LOCATION, location))
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ── Invalid ───────────────────────────────────────────────────────────────────

/// Input that failed decoding or validation. Produced before the handler runs.
#[derive(Debug, Default)]
pub struct Invalid {
    /// Public message. [`INTERNAL_VALIDATION_ERROR`] marks a broken validator.
    pub message: String,
    pub validators: Option<Validators>,
    pub source: Option<Error>,
}

impl Invalid {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = Some(validators);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Field errors first, then a public message, then the fallback:
    ///
    /// | field errors | message                       | status |
    /// |--------------|-------------------------------|--------|
    /// | non-empty    | any                           | 400    |
    /// | empty        | non-empty, not the sentinel   | 422    |
    /// | empty        | empty or the sentinel         | 503    |
    pub fn status(&self) -> StatusCode {
        if self.validators.as_ref().is_some_and(|v| !v.is_empty()) {
            StatusCode::BAD_REQUEST
        } else if !self.message.is_empty() && self.message != INTERNAL_VALIDATION_ERROR {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }

    pub fn render(&self) -> Response {
        let status = self.status();
        match status {
            StatusCode::BAD_REQUEST => {
                let validators = self.validators.as_ref();
                match serde_json::to_vec(&validators) {
                    Ok(body) => Response::json(status, body),
                    Err(_) => Response::error(status, reason(status)),
                }
            }
            StatusCode::UNPROCESSABLE_ENTITY => Response::error(status, self.to_string()),
            _ => Response::error(status, format!("({}) {}", status.as_u16(), reason(status))),
        }
    }
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (status, detail) = if self.message.is_empty() {
            (StatusCode::BAD_REQUEST, None)
        } else if self.message == INTERNAL_VALIDATION_ERROR {
            (StatusCode::INTERNAL_SERVER_ERROR, None)
        } else {
            (StatusCode::UNPROCESSABLE_ENTITY, Some(&self.message))
        };

        write!(f, "({}) {}", status.as_u16(), reason(status))?;
        if let Some(detail) = detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl StdError for Invalid {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn StdError + 'static))
    }
}

// ── Exception ─────────────────────────────────────────────────────────────────

/// A failure reported by the handler.
///
/// Only `status` and `message` reach the client. `log`, `cause` and
/// `metadata` are for the error log.
///
/// ```rust
/// use http::StatusCode;
/// use verdict::Exception;
///
/// let e = Exception::new(StatusCode::NOT_FOUND)
///     .message("user not found")
///     .log("lookup by id returned no rows")
///     .with_metadata("id", 7);
/// assert_eq!(e.to_string(), "(404) user not found");
/// ```
#[derive(Debug)]
pub struct Exception {
    pub status: StatusCode,
    pub message: String,
    pub log: String,
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
    pub metadata: Map<String, Value>,
}

impl Exception {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: String::new(),
            log: String::new(),
            cause: None,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    #[must_use]
    pub fn caused_by(mut self, cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn render(&self) -> Response {
        Response::error(self.status, self.to_string())
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = if self.message.is_empty() { reason(self.status) } else { &self.message };
        write!(f, "({}) {}", self.status.as_u16(), message)
    }
}

impl StdError for Exception {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Exactly one of these ends every invocation.
#[derive(Debug)]
pub enum Outcome {
    Success(Success),
    Redirect(Redirect),
    Invalid(Invalid),
    Exception(Exception),
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Redirect(_) => "redirect",
            Self::Invalid(_) => "invalid",
            Self::Exception(_) => "exception",
        }
    }

    pub fn render(self, method: &Method) -> Result<Response, Error> {
        match self {
            Self::Success(success) => Ok(success.render()),
            Self::Redirect(redirect) => redirect.render(method),
            Self::Invalid(invalid) => Ok(invalid.render()),
            Self::Exception(exception) => Ok(exception.render()),
        }
    }
}
