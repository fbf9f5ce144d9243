use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{wire, ApiErrorDetail, ApiResponse, SendGridError};

/// Selects which part of a JSON response body is deserialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unwrap {
    /// Deserialize the entire body.
    WholeBody,
    /// Deserialize the value stored under this key of the top-level object,
    /// e.g. `"recipients"` in `{"recipients": [...]}`.
    Field(String),
}

impl Unwrap {
    pub fn field(key: impl Into<String>) -> Self {
        Self::Field(key.into())
    }
}

/// Deserializes a response body into `T`.
///
/// Non-success statuses become [`SendGridError::Http`] before the body is
/// looked at. An empty body is read as JSON `null`, so `()` and `Option<_>`
/// targets accept `204 No Content`.
pub fn parse<T: DeserializeOwned>(
    response: &ApiResponse,
    unwrap: &Unwrap,
) -> Result<T, SendGridError> {
    ensure_success(response)?;

    let body = response.body();
    let text = if body.trim().is_empty() { "null" } else { body };

    match unwrap {
        Unwrap::WholeBody => serde_json::from_str(text).map_err(|err| invalid_json(&err, body)),
        Unwrap::Field(key) => {
            let value = serde_json::from_str(text).map_err(|err| invalid_json(&err, body))?;
            let field = extract_field(value, key)?;
            serde_json::from_value(field).map_err(|err| invalid_field(&err, key))
        }
    }
}

fn invalid_json(err: &serde_json::Error, body: &str) -> SendGridError {
    SendGridError::Decode(format!("invalid response JSON: {err}; body: {body}"))
}

fn invalid_field(err: &serde_json::Error, key: &str) -> SendGridError {
    SendGridError::Decode(format!("invalid value under '{key}': {err}"))
}

/// Returns `Ok(())` for 2xx responses and a typed HTTP error otherwise.
pub(crate) fn ensure_success(response: &ApiResponse) -> Result<(), SendGridError> {
    if response.is_success() {
        return Ok(());
    }
    Err(SendGridError::Http {
        status: response.status().as_u16(),
        body: response.body().to_owned(),
        errors: decode_error_details(response.body()),
    })
}

fn extract_field(value: JsonValue, key: &str) -> Result<JsonValue, SendGridError> {
    match value {
        JsonValue::Object(mut map) => map.remove(key).ok_or_else(|| {
            SendGridError::Decode(format!("missing key '{key}' in response object"))
        }),
        other => Err(SendGridError::Decode(format!(
            "expected JSON object containing '{key}', got {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn decode_error_details(body: &str) -> Vec<ApiErrorDetail> {
    let Ok(envelope) = serde_json::from_str::<wire::ErrorEnvelope>(body) else {
        return Vec::new();
    };

    envelope
        .errors
        .into_iter()
        .map(|entry| ApiErrorDetail {
            field: entry.field,
            message: entry.message.unwrap_or_default(),
        })
        .collect()
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
