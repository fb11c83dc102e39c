//! Input decoding and validation.
//!
//! A request body is accepted as a [`Shape`] in four steps:
//!
//! 1. parse as JSON, else `"Valid JSON Required as Input"`;
//! 2. deserialise into the shape, same message on failure;
//! 3. build the shape's JSON Schema validator, else
//!    [`INTERNAL_VALIDATION_ERROR`] (the validator itself is broken);
//! 4. validate; on violations the shape's [`Shape::help`] supplies the
//!    per-field messages. When it reports every field as valid, the schema's
//!    own violations are reported instead, keyed by field path.
//!
//! Validators are compiled once per shape type and cached for the life of the
//! process.
//!
//! Fields the schema marks as `required` should carry `#[serde(default)]`,
//! otherwise a missing field fails step 2 and the client never sees the
//! per-field report.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use indexmap::IndexMap;
use jsonschema::ValidationError;
use jsonschema::error::ValidationErrorKind;
use jsonschema::paths::LocationSegment;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::outcome::Invalid;

/// Public message for a body that is not JSON or does not fit the shape.
pub const JSON_REQUIRED: &str = "Valid JSON Required as Input";

/// Public message for a shape whose schema cannot be compiled.
pub const INTERNAL_VALIDATION_ERROR: &str = "Internal Validation Error";

/// Field name → validation report, in the order the shape lists them.
pub type Validators = IndexMap<String, Validator>;

/// The report for one field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Validator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub valid: bool,
    pub message: String,
}

impl Validator {
    pub fn invalid(value: impl Into<Value>, message: impl Into<String>) -> Self {
        Self { value: Some(value.into()), valid: false, message: message.into() }
    }

    pub fn valid(value: impl Into<Value>) -> Self {
        Self { value: Some(value.into()), valid: true, message: String::new() }
    }
}

/// A request body type the engine can decode and validate.
///
/// ```rust
/// use serde::Deserialize;
/// use serde_json::{json, Value};
/// use verdict::validation::{Shape, Validator, Validators};
///
/// #[derive(Deserialize)]
/// struct NewUser {
///     #[serde(default)]
///     name: String,
/// }
///
/// impl Shape for NewUser {
///     fn schema() -> Value {
///         json!({
///             "type": "object",
///             "properties": { "name": { "type": "string", "minLength": 1 } },
///             "required": ["name"]
///         })
///     }
///
///     fn help(&self) -> Validators {
///         let mut fields = Validators::new();
///         if self.name.is_empty() {
///             fields.insert("name".into(), Validator::invalid(self.name.as_str(), "name is required"));
///         }
///         fields
///     }
/// }
/// ```
pub trait Shape: DeserializeOwned + Send + Sync + 'static {
    /// JSON Schema the raw body must satisfy.
    fn schema() -> Value;

    /// Per-field reports for this value. Consulted only when validation
    /// failed; entries marked valid are dropped from the client response.
    fn help(&self) -> Validators;
}

static VALIDATORS: LazyLock<RwLock<HashMap<TypeId, Arc<jsonschema::Validator>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn compiled<T: Shape>() -> Result<Arc<jsonschema::Validator>, Error> {
    let id = TypeId::of::<T>();

    if let Some(validator) = VALIDATORS.read().unwrap_or_else(PoisonError::into_inner).get(&id) {
        return Ok(Arc::clone(validator));
    }

    let validator = jsonschema::validator_for(&T::schema())
        .map(Arc::new)
        .map_err(|e| Error::Schema(e.to_string()))?;

    debug!(shape = std::any::type_name::<T>(), "compiled input validator");

    // A concurrent first request may have compiled it too; the first insert wins.
    let mut cache = VALIDATORS.write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(cache.entry(id).or_insert(validator)))
}

/// Decodes and validates `body` as `T`.
pub fn decode<T: Shape>(body: &[u8]) -> Result<T, Invalid> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "unable to parse request body");
        Invalid::new(JSON_REQUIRED).with_source(e.into())
    })?;

    let input = T::deserialize(&value).map_err(|e| {
        warn!(error = %e, "request body does not fit input shape");
        Invalid::new(JSON_REQUIRED).with_source(e.into())
    })?;

    let validator = compiled::<T>().map_err(|e| {
        error!(error = %e, shape = std::any::type_name::<T>(), "invalid validator");
        Invalid::new(INTERNAL_VALIDATION_ERROR).with_source(e)
    })?;

    let mut reported = Validators::new();
    let mut violations = Vec::new();
    for violation in validator.iter_errors(&value) {
        let message = violation.to_string();
        warn!(index = violations.len(), violation = %message, "validation violation");

        reported.entry(field(&violation)).or_insert_with(|| Validator {
            value: offending(&violation),
            valid: false,
            message: message.clone(),
        });
        violations.push(message);
    }

    if violations.is_empty() {
        return Ok(input);
    }

    let mut fields = input.help();
    fields.retain(|_, report| !report.valid);

    // The shape's own reports cover nothing the schema rejected.
    if fields.is_empty() {
        fields = reported;
    }

    Err(Invalid::default()
        .with_validators(fields)
        .with_source(Error::Violations(violations)))
}

/// Dotted path of the rejected field; a missing required property is named
/// under its parent. Violations of the body as a whole report as `body`.
fn field(violation: &ValidationError<'_>) -> String {
    let mut segments: Vec<String> = violation
        .instance_path()
        .iter()
        .map(|segment| match segment {
            LocationSegment::Property(name) => name.into_owned(),
            LocationSegment::Index(index) => index.to_string(),
        })
        .collect();

    if let ValidationErrorKind::Required { property } = violation.kind() {
        segments.push(property.as_str().map_or_else(|| property.to_string(), str::to_owned));
    }

    if segments.is_empty() { "body".to_owned() } else { segments.join(".") }
}

/// The rejected value, or nothing when the field is missing altogether.
fn offending(violation: &ValidationError<'_>) -> Option<Value> {
    match violation.kind() {
        ValidationErrorKind::Required { .. } => None,
        _ => Some(violation.instance().clone().into_owned()),
    }
}
