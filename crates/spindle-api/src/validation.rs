//! Request body validation.
//!
//! Bodies are read as raw JSON and checked field by field so that every
//! problem is reported at once as `{path, message}` pairs.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Collects field issues while reading values out of a JSON object
pub struct Validator<'a> {
    body: &'a Map<String, Value>,
    issues: Vec<FieldError>,
}

impl<'a> Validator<'a> {
    pub fn new(body: &'a Map<String, Value>) -> Self {
        Self {
            body,
            issues: Vec::new(),
        }
    }

    /// A string of at least `min_len` characters
    pub fn required_string(&mut self, field: &str, min_len: usize) -> Option<String> {
        match self.body.get(field) {
            None => {
                self.issue(field, "Required");
                None
            }
            Some(value) => {
                let s = self.expect_string(field, value)?;
                if s.chars().count() < min_len {
                    self.issue(
                        field,
                        format!("String must contain at least {} character(s)", min_len),
                    );
                    return None;
                }
                Some(s)
            }
        }
    }

    /// Absent is fine; present must be a string. Explicit `null` is rejected.
    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        let value = self.body.get(field)?;
        self.expect_string(field, value)
    }

    pub fn optional_object(&mut self, field: &str) -> Option<Map<String, Value>> {
        match self.body.get(field)? {
            Value::Object(map) => Some(map.clone()),
            other => {
                self.issue(
                    field,
                    format!("Expected object, received {}", type_name(other)),
                );
                None
            }
        }
    }

    /// `value` is the assembled result; it is `None` only when a required
    /// field already recorded an issue.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, Vec<FieldError>> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(self.issues),
        }
    }

    fn expect_string(&mut self, field: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.issue(
                    field,
                    format!("Expected string, received {}", type_name(other)),
                );
                None
            }
        }
    }

    fn issue(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(FieldError::new(field, message));
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A request body that can be built from a validated JSON object
pub trait Validate: Sized {
    fn validate(body: &Map<String, Value>) -> Result<Self, Vec<FieldError>>;
}

/// JSON body extractor that answers `VALIDATION_ERROR` instead of axum's
/// plain-text rejections
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::invalid("body", "Could not read request body"))?;

        parse_body(&bytes).map(ValidJson)
    }
}

pub fn parse_body<T: Validate>(bytes: &[u8]) -> Result<T, ApiError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|_| ApiError::invalid("body", "Invalid JSON"))?;

    match value {
        Value::Object(body) => T::validate(&body).map_err(ApiError::Validation),
        other => Err(ApiError::invalid(
            "body",
            format!("Expected object, received {}", type_name(&other)),
        )),
    }
}
